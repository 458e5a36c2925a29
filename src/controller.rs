//! Executes [`Command`]s from the view state as tokio tasks and reports the
//! results back as [`AppEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::contract::TipJarContract;
use crate::rpc_utils::ReadOnlyNode;
use crate::session::Session;
use crate::tx::{build_tip_call, submit_tip, TipRequest};
use crate::types::{AppEvent, Command, FailedOp};
use crate::wallet::Wallet;

pub struct Controller<N: ReadOnlyNode + 'static, W: Wallet + 'static> {
    contract: TipJarContract<N>,
    wallet: Arc<W>,
    session: Arc<Mutex<Session>>,
    refresh_delay: Duration,
    tx: UnboundedSender<AppEvent>,
}

impl<N: ReadOnlyNode + 'static, W: Wallet + 'static> Controller<N, W> {
    pub fn new(
        contract: TipJarContract<N>,
        wallet: W,
        session: Session,
        refresh_delay_ms: u64,
        tx: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            contract,
            wallet: Arc::new(wallet),
            session: Arc::new(Mutex::new(session)),
            refresh_delay: Duration::from_millis(refresh_delay_ms),
            tx,
        }
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    /// Run `cmd` in the background. Never blocks the caller.
    pub fn dispatch(&self, cmd: Command) {
        log::debug!("dispatch {cmd:?}");
        let contract = self.contract.clone();
        let wallet = Arc::clone(&self.wallet);
        let session = Arc::clone(&self.session);
        let delay = self.refresh_delay;
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let ev = run_command(cmd, &contract, wallet.as_ref(), &session, delay).await;
            // The UI may already be gone on shutdown.
            let _ = tx.send(ev);
        });
    }

    pub fn dispatch_all(&self, cmds: Vec<Command>) {
        for cmd in cmds {
            self.dispatch(cmd);
        }
    }
}

fn failed(what: FailedOp, e: impl std::fmt::Display) -> AppEvent {
    AppEvent::Failed {
        what,
        error: e.to_string(),
    }
}

/// One command to one event. Errors become [`AppEvent::Failed`]; the view
/// keeps whatever it showed before.
pub async fn run_command<N: ReadOnlyNode, W: Wallet + ?Sized>(
    cmd: Command,
    contract: &TipJarContract<N>,
    wallet: &W,
    session: &Mutex<Session>,
    refresh_delay: Duration,
) -> AppEvent {
    match cmd {
        Command::FetchStats => fetch_stats(contract).await,
        Command::RefreshStatsAfterDelay => {
            tokio::time::sleep(refresh_delay).await;
            fetch_stats(contract).await
        }
        Command::FetchRecentTips { count } => {
            AppEvent::RecentTipsLoaded(contract.recent_tips(count).await)
        }
        Command::FetchOwner => match contract.get_owner().await {
            Ok(owner) => AppEvent::OwnerLoaded(owner),
            Err(e) => failed(FailedOp::Owner, e),
        },
        Command::FetchBalance { address } => match contract.account_balance(&address).await {
            Ok(balance) => AppEvent::BalanceLoaded { address, balance },
            Err(e) => failed(FailedOp::Balance, e),
        },
        Command::Connect => connect(wallet, session).await,
        Command::Disconnect => match session.lock().await.disconnect() {
            Ok(()) => AppEvent::Disconnected,
            Err(e) => {
                // The address is already gone in memory; the view should say so.
                log::warn!("Session store not cleared: {e}");
                AppEvent::Disconnected
            }
        },
        Command::SubmitTip(req) => submit(req, contract, wallet, session).await,
    }
}

async fn fetch_stats<N: ReadOnlyNode>(contract: &TipJarContract<N>) -> AppEvent {
    match contract.get_stats().await {
        Ok(stats) => {
            log::info!(
                "Stats: {} tips, {} µSTX",
                stats.total_tips,
                stats.total_amount
            );
            AppEvent::StatsLoaded(stats)
        }
        Err(e) => failed(FailedOp::Stats, e),
    }
}

async fn connect<W: Wallet + ?Sized>(wallet: &W, session: &Mutex<Session>) -> AppEvent {
    // Not held across the wallet wait.
    let (app, network) = {
        let s = session.lock().await;
        (s.app().clone(), s.network())
    };
    let user = match wallet.connect(&app).await {
        Ok(user) => user,
        Err(e) => return failed(FailedOp::Connect, e),
    };
    match session
        .lock()
        .await
        .connect_with_address(user.address_for(network))
    {
        Ok(address) => AppEvent::Connected(address),
        Err(e) => failed(FailedOp::Connect, e),
    }
}

async fn submit<N: ReadOnlyNode, W: Wallet + ?Sized>(
    req: TipRequest,
    contract: &TipJarContract<N>,
    wallet: &W,
    session: &Mutex<Session>,
) -> AppEvent {
    // Not held across the wallet wait.
    let (sender, network, app) = {
        let s = session.lock().await;
        match s.current_address() {
            Some(a) => (a.to_string(), s.network(), s.app().clone()),
            None => return failed(FailedOp::Tip, "not connected"),
        }
    };
    let call = build_tip_call(contract.contract(), &sender, network, &req);
    match submit_tip(wallet, &app, &call).await {
        Ok(outcome) => AppEvent::TipSubmitted(outcome),
        Err(e) => failed(FailedOp::Tip, e),
    }
}
