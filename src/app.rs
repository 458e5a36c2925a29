use std::time::{Duration, Instant};

use crate::config::{ContractId, Network};
use crate::tx::TipRequest;
use crate::types::{
    sum_amounts, unique_tippers, AppEvent, Command, FailedOp, Tip, TipStats, WalletState,
    AMOUNT_PRESETS, DEFAULT_AMOUNT, MAX_MESSAGE_CHARS,
};
use crate::util_text::{format_stx, truncate_address};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Amount,
    Message,
}

/// All view state. Mutated only on the UI loop, from key handlers and
/// [`App::on_event`]; asynchronous work is requested by queueing a
/// [`Command`] for the controller.
pub struct App {
    quit: bool,
    network: Network,
    contract: ContractId,
    min_tip: u128,

    wallet: WalletState,
    connecting: bool,
    stats: Option<TipStats>,
    owner: Option<String>,
    recent: Vec<Tip>,

    input_mode: InputMode,
    amount_input: String,
    message_input: String,
    sending: bool,
    last_txid: Option<String>,

    toast_message: Option<(String, Instant)>,
    pending: Vec<Command>,
}

impl App {
    pub fn new(network: Network, contract: ContractId, min_tip: u128, wallet: WalletState) -> Self {
        Self {
            quit: false,
            network,
            contract,
            min_tip,
            wallet,
            connecting: false,
            stats: None,
            owner: None,
            recent: Vec::new(),
            input_mode: InputMode::Normal,
            amount_input: DEFAULT_AMOUNT.to_string(),
            message_input: String::new(),
            sending: false,
            last_txid: None,
            toast_message: None,
            pending: Vec::new(),
        }
    }

    /// Initial loads: stats and owner always, balance if a session was restored.
    pub fn start(&mut self) {
        self.pending.push(Command::FetchStats);
        self.pending.push(Command::FetchOwner);
        if let Some(address) = self.wallet.address.clone() {
            self.pending.push(Command::FetchBalance { address });
        }
    }

    /// Drain queued work for the controller.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }

    // ----- accessors -----
    pub fn quit_flag(&self) -> bool {
        self.quit
    }
    pub fn network(&self) -> Network {
        self.network
    }
    pub fn contract(&self) -> &ContractId {
        &self.contract
    }
    pub fn wallet(&self) -> &WalletState {
        &self.wallet
    }
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }
    pub fn stats(&self) -> Option<TipStats> {
        self.stats
    }
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
    pub fn recent_tips(&self) -> &[Tip] {
        &self.recent
    }
    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }
    pub fn amount_input(&self) -> &str {
        &self.amount_input
    }
    pub fn message_input(&self) -> &str {
        &self.message_input
    }
    pub fn is_sending(&self) -> bool {
        self.sending
    }
    pub fn last_txid(&self) -> Option<&str> {
        self.last_txid.as_deref()
    }

    // ----- derived display -----

    /// Total tipped, in STX; "-" until stats arrive.
    pub fn total_display(&self) -> String {
        self.stats
            .map(|s| format_stx(s.total_amount))
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn count_display(&self) -> String {
        self.stats
            .map(|s| s.total_tips.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn unique_tippers(&self) -> usize {
        unique_tippers(&self.recent)
    }

    pub fn recent_total(&self) -> u128 {
        sum_amounts(&self.recent)
    }

    pub fn address_display(&self) -> Option<String> {
        self.wallet.address.as_deref().map(truncate_address)
    }

    pub fn can_send(&self) -> bool {
        self.wallet.connected && !self.sending
    }

    /// Show a toast for a few seconds.
    pub fn show_toast(&mut self, msg: String) {
        self.toast_message = Some((msg, Instant::now()));
    }

    pub fn toast_message(&self) -> Option<&str> {
        const TOAST_DURATION: Duration = Duration::from_secs(4);
        self.toast_message.as_ref().and_then(|(msg, time)| {
            if time.elapsed() < TOAST_DURATION {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    // ----- user actions -----

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn request_connect(&mut self) {
        if self.wallet.connected || self.connecting {
            return;
        }
        self.connecting = true;
        self.show_toast("Waiting for wallet approval...".to_string());
        self.pending.push(Command::Connect);
    }

    pub fn request_disconnect(&mut self) {
        if !self.wallet.connected {
            return;
        }
        self.pending.push(Command::Disconnect);
    }

    pub fn refresh(&mut self) {
        self.pending.push(Command::FetchStats);
        if let Some(count) = self.stats.map(|s| s.total_tips).filter(|&n| n > 0) {
            self.pending.push(Command::FetchRecentTips { count });
        }
        if let Some(address) = self.wallet.address.clone() {
            self.pending.push(Command::FetchBalance { address });
        }
    }

    pub fn edit_amount(&mut self) {
        self.input_mode = InputMode::Amount;
    }

    pub fn edit_message(&mut self) {
        self.input_mode = InputMode::Message;
    }

    pub fn finish_input(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn input_char(&mut self, c: char) {
        match self.input_mode {
            InputMode::Amount => {
                if c.is_ascii_digit() || (c == '.' && !self.amount_input.contains('.')) {
                    self.amount_input.push(c);
                }
            }
            InputMode::Message => {
                if self.message_input.chars().count() < MAX_MESSAGE_CHARS {
                    self.message_input.push(c);
                }
            }
            InputMode::Normal => {}
        }
    }

    pub fn input_backspace(&mut self) {
        match self.input_mode {
            InputMode::Amount => {
                self.amount_input.pop();
            }
            InputMode::Message => {
                self.message_input.pop();
            }
            InputMode::Normal => {}
        }
    }

    /// Quick-pick amount by position (0-based) in the preset list.
    pub fn apply_preset(&mut self, idx: usize) {
        if let Some(stx) = AMOUNT_PRESETS.get(idx) {
            self.amount_input = stx.to_string();
        }
    }

    /// Validate the form and queue the submission. Invalid input stays in
    /// the form with a toast explaining why.
    pub fn send(&mut self) {
        if !self.wallet.connected {
            self.show_toast("Connect a wallet first (c)".to_string());
            return;
        }
        if self.sending {
            return;
        }
        match TipRequest::new(&self.amount_input, &self.message_input, self.min_tip) {
            Ok(req) => {
                self.sending = true;
                self.input_mode = InputMode::Normal;
                self.show_toast(format!(
                    "Confirm the {} STX tip in your wallet...",
                    format_stx(req.amount_micro)
                ));
                self.pending.push(Command::SubmitTip(req));
            }
            Err(e) => self.show_toast(e.to_string()),
        }
    }

    // ----- events -----
    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::StatsLoaded(stats) => {
                let prev = self.stats.map(|s| s.total_tips);
                self.stats = Some(stats);
                if prev != Some(stats.total_tips) && stats.total_tips > 0 {
                    self.pending.push(Command::FetchRecentTips {
                        count: stats.total_tips,
                    });
                }
            }
            AppEvent::RecentTipsLoaded(tips) => self.recent = tips,
            AppEvent::OwnerLoaded(owner) => self.owner = Some(owner),
            AppEvent::BalanceLoaded { address, balance } => {
                // Ignore answers for an address we are no longer showing.
                if self.wallet.address.as_deref() == Some(address.as_str()) {
                    self.wallet.balance = Some(balance);
                }
            }
            AppEvent::Connected(address) => {
                self.connecting = false;
                self.show_toast(format!("Connected: {}", truncate_address(&address)));
                self.pending.push(Command::FetchBalance {
                    address: address.clone(),
                });
                self.wallet = WalletState::connected(address);
            }
            AppEvent::Disconnected => {
                self.wallet = WalletState::default();
                self.show_toast("Disconnected".to_string());
            }
            AppEvent::TipSubmitted(outcome) => {
                self.sending = false;
                self.amount_input = DEFAULT_AMOUNT.to_string();
                self.message_input.clear();
                self.show_toast(format!("Tip sent! Transaction ID: {}", outcome.txid));
                self.last_txid = Some(outcome.txid);
                self.pending.push(Command::RefreshStatsAfterDelay);
            }
            AppEvent::Failed { what, error } => {
                log::warn!("{what} failed: {error}");
                match what {
                    FailedOp::Tip => self.sending = false,
                    FailedOp::Connect => self.connecting = false,
                    FailedOp::Stats | FailedOp::Owner | FailedOp::Balance => {}
                }
                self.show_toast(format!("{what} failed: {error}"));
            }
        }
    }
}
