// Native binary for the STX Tip Jar - terminal UI and one-shot commands

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    future::Future,
    io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use tipjar::{
    app::{App, InputMode},
    config::{load, CliCommand, Config},
    contract::TipJarContract,
    controller::Controller,
    handoff::HandoffWallet,
    rpc_utils::StacksNode,
    session::{Session, SqliteSessionStore},
    tx::{build_tip_call, submit_tip, TipRequest},
    types::AppEvent,
    ui,
    util_text::{format_stx, truncate_address},
    wallet::AppDetails,
    TipJarError,
};

const FRAME_BUDGET: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    let (cfg, command) = load().context("Failed to load configuration")?;
    let command = command.unwrap_or(CliCommand::Ui);
    init_logging(&cfg, command == CliCommand::Ui)?;

    let node = StacksNode::new(&cfg.node_url, cfg.rpc_timeout_ms)?;
    let contract = TipJarContract::new(node, cfg.contract.clone());

    let store = SqliteSessionStore::open(&cfg.session_db)
        .with_context(|| format!("Failed to open session database {}", cfg.session_db))?;
    let mut session = Session::new(
        Box::new(store),
        AppDetails::new(cfg.app_name.clone()),
        cfg.network,
    );
    if let Err(e) = session.restore() {
        log::warn!("Could not restore session: {e}");
    }
    let wallet = HandoffWallet::new(&cfg.handoff_dir, cfg.network, cfg.wallet_timeout_ms);

    match command {
        CliCommand::Ui => run_ui(cfg, contract, wallet, session).await,
        CliCommand::Stats => print_stats(&contract).await,
        CliCommand::Recent => print_recent(&contract).await,
        CliCommand::Status => print_status(&cfg, &contract, &session).await,
        CliCommand::Connect { address } => {
            let addr = match address {
                Some(a) => session.connect_with_address(&a)?,
                None => {
                    eprintln!(
                        "Approve the connection in your wallet (watching {})",
                        cfg.handoff_dir.display()
                    );
                    interruptible(session.connect(&wallet)).await?
                }
            };
            println!("Connected: {addr}");
            Ok(())
        }
        CliCommand::Disconnect => {
            session.disconnect()?;
            println!("Disconnected");
            Ok(())
        }
        CliCommand::Tip { amount, message } => {
            let req = TipRequest::new(&amount, &message, cfg.min_tip_micro)?;
            let sender = session
                .current_address()
                .ok_or_else(|| anyhow!("Not connected. Run `tipjar connect` first."))?
                .to_string();
            let call = build_tip_call(&cfg.contract, &sender, cfg.network, &req);
            eprintln!(
                "Sending {} STX from {}. Confirm in your wallet (watching {})",
                format_stx(req.amount_micro),
                truncate_address(&sender),
                cfg.handoff_dir.display()
            );
            let outcome = interruptible(submit_tip(&wallet, session.app(), &call)).await?;
            println!("Tip sent! Transaction ID: {}", outcome.txid);
            println!("{}", cfg.network.explorer_tx_url(&outcome.txid));
            Ok(())
        }
    }
}

fn init_logging(cfg: &Config, to_file: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if to_file {
        // The terminal belongs to the UI; logs go to a file instead.
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.log_file)
            .with_context(|| format!("Failed to open log file {}", cfg.log_file))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Ctrl+C while waiting on the wallet counts as cancelling the request.
async fn interruptible<T>(fut: impl Future<Output = tipjar::Result<T>>) -> tipjar::Result<T> {
    tokio::select! {
        r = fut => r,
        _ = tokio::signal::ctrl_c() => Err(TipJarError::UserRejected("interrupted".into())),
    }
}

async fn print_stats(contract: &TipJarContract<StacksNode>) -> Result<()> {
    let (stats, owner) =
        futures::future::try_join(contract.get_stats(), contract.get_owner()).await?;
    println!("Contract: {}", contract.contract());
    println!("Owner:    {owner}");
    println!("Tips:     {}", stats.total_tips);
    println!("Total:    {} STX", format_stx(stats.total_amount));
    Ok(())
}

async fn print_recent(contract: &TipJarContract<StacksNode>) -> Result<()> {
    let count = contract.get_tip_count().await?;
    let tips = contract.recent_tips(count).await;
    if tips.is_empty() {
        println!("No tips yet");
        return Ok(());
    }
    for t in tips {
        println!(
            "{:>12} STX  {}  block {:<8} {}",
            format_stx(t.amount),
            t.tipper,
            t.block,
            t.message
        );
    }
    Ok(())
}

async fn print_status(
    cfg: &Config,
    contract: &TipJarContract<StacksNode>,
    session: &Session,
) -> Result<()> {
    cfg.print_summary();
    match session.current_address() {
        Some(addr) => {
            println!("Connected: {addr}");
            match contract.account_balance(addr).await {
                Ok(b) => println!("Balance:   {} STX", format_stx(b)),
                Err(e) => println!("Balance:   unavailable ({e})"),
            }
        }
        None => println!("Not connected"),
    }
    Ok(())
}

async fn run_ui(
    cfg: Config,
    contract: TipJarContract<StacksNode>,
    wallet: HandoffWallet,
    session: Session,
) -> Result<()> {
    let mut app = App::new(
        cfg.network,
        cfg.contract.clone(),
        cfg.min_tip_micro,
        session.wallet_state(),
    );
    let (tx, rx) = unbounded_channel::<AppEvent>();
    let controller = Controller::new(contract, wallet, session, cfg.refresh_delay_ms, tx);
    log::info!("Starting UI for {} on {}", cfg.contract, cfg.network);
    app.start();

    // terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_loop(&mut app, &mut terminal, rx, &controller).await;

    // cleanup, even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut rx: UnboundedReceiver<AppEvent>,
    controller: &Controller<StacksNode, HandoffWallet>,
) -> Result<()> {
    terminal.draw(|f| ui::draw(f, app))?;
    let mut last_frame = Instant::now();

    loop {
        controller.dispatch_all(app.take_commands());

        let wait = FRAME_BUDGET.saturating_sub(last_frame.elapsed());
        if event::poll(wait)? {
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    handle_key(app, k);
                }
            }
        }
        while let Ok(ev) = rx.try_recv() {
            app.on_event(ev);
        }

        if last_frame.elapsed() >= FRAME_BUDGET {
            terminal.draw(|f| ui::draw(f, app))?;
            last_frame = Instant::now();
        }
        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, k: KeyEvent) {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (k.code, k.modifiers) {
        app.request_quit();
        return;
    }

    // Text entry swallows everything until Enter/Esc
    if app.input_mode() != InputMode::Normal {
        match k.code {
            KeyCode::Char(c) => app.input_char(c),
            KeyCode::Backspace => app.input_backspace(),
            KeyCode::Enter | KeyCode::Esc => app.finish_input(),
            _ => {}
        }
        return;
    }

    match k.code {
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('c') => app.request_connect(),
        KeyCode::Char('d') => app.request_disconnect(),
        KeyCode::Char('a') => app.edit_amount(),
        KeyCode::Char('m') => app.edit_message(),
        KeyCode::Char(c @ '1'..='4') => app.apply_preset(c as usize - '1' as usize),
        KeyCode::Char('s') | KeyCode::Enter => app.send(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
}
