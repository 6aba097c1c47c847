//! Interactive console surface.
//!
//! Reads commands from stdin, prints surface events and boss changes to
//! stdout. While a long-poll retry prompt is pending, the next input line
//! answers it instead of being parsed as a command. Actions still in flight
//! when the console exits run to completion and their outcome is printed.

use clanraid_sync::{
    ActionDispatcher, ChannelSurface, HttpTransport, PollExit, PollHandle, PollState,
    RetryDecision, Session, SharedStore, SurfaceEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::command::{self, Command, CommandError};

type Dispatcher = ActionDispatcher<HttpTransport, ChannelSurface>;

/// Run the console until `quit`, end of input, or Ctrl-C.
pub async fn run(
    session: &Session<HttpTransport, ChannelSurface>,
    poll: &PollHandle,
    mut events: mpsc::UnboundedReceiver<SurfaceEvent>,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut boss = session.store().subscribe();
    let mut poll_state = poll.subscribe();
    let mut poll_running = true;
    let mut pending_prompt: Option<oneshot::Sender<RetryDecision>> = None;
    let mut actions = JoinSet::new();

    print_status(session.store());

    let result = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                };
                if let Some(reply) = pending_prompt.take() {
                    answer_prompt(reply, &line);
                    continue;
                }
                match command::parse(&line) {
                    Ok(Command::Quit) => break Ok(()),
                    Ok(Command::Help) => println!("{}", command::HELP),
                    Ok(Command::Status) => print_status(session.store()),
                    Ok(command) => {
                        actions.spawn(execute(session.dispatcher(), command));
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Some(event) = events.recv() => {
                if let Some(reply) = show_event(event) {
                    println!("type `r` to retry, anything else to stop watching");
                    pending_prompt = Some(reply);
                }
            }
            Some(joined) = actions.join_next() => log_join(joined),
            Ok(()) = boss.changed() => {
                drop(boss.borrow_and_update());
                print_status(session.store());
            }
            changed = poll_state.changed(), if poll_running => {
                let state = *poll_state.borrow_and_update();
                if changed.is_err() || state.is_terminated() {
                    poll_running = false;
                }
                if state == PollState::Terminated(PollExit::Abandoned) {
                    println!("stopped watching boss updates; actions still work");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break Ok(());
            }
        }
    };

    let pending = actions.len();
    if pending > 0 {
        println!("waiting for {pending} action(s) to finish");
    }
    settle(&mut actions, &mut events).await;
    result
}

/// Wait for every in-flight action, then print the events they left queued.
/// Returns how many events were printed.
async fn settle(
    actions: &mut JoinSet<()>,
    events: &mut mpsc::UnboundedReceiver<SurfaceEvent>,
) -> usize {
    while let Some(joined) = actions.join_next().await {
        log_join(joined);
    }
    let mut shown = 0_usize;
    while let Ok(event) = events.try_recv() {
        // Polling stops with the console; an open prompt is left unanswered.
        drop(show_event(event));
        shown = shown.saturating_add(1);
    }
    shown
}

/// Print one surface event. Returns the reply channel of a retry prompt.
fn show_event(event: SurfaceEvent) -> Option<oneshot::Sender<RetryDecision>> {
    match event {
        SurfaceEvent::Notice(notice) => println!("[notice] {}", notice.text),
        SurfaceEvent::ActionFailed { action, error } => println!("[{action} failed] {error}"),
        SurfaceEvent::RetryPrompt { error, reply } => {
            println!("boss updates interrupted: {error}");
            return Some(reply);
        }
    }
    None
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "action task failed");
    }
}

fn answer_prompt(reply: oneshot::Sender<RetryDecision>, line: &str) {
    let decision = if line.trim().eq_ignore_ascii_case("r") {
        RetryDecision::Retry
    } else {
        RetryDecision::Abandon
    };
    if reply.send(decision).is_err() {
        tracing::debug!("retry prompt already closed");
    }
}

async fn execute(dispatcher: Dispatcher, command: Command) {
    // Failures and notices reach the user through surface events.
    let _outcome = match command {
        Command::Damage { amount, behalf } => dispatcher.record_damage(amount, behalf).await,
        Command::Defeat { behalf } => dispatcher.record_defeat(behalf).await,
        Command::Undo => dispatcher.undo().await,
        Command::Apply => dispatcher.apply_for_turn().await,
        Command::Release => dispatcher.cancel_application().await,
        Command::Subscribe(target) => dispatcher.subscribe(target).await,
        Command::Unsubscribe(target) => dispatcher.unsubscribe(target).await,
        Command::Modify {
            cycle,
            boss_num,
            health,
        } => dispatcher.modify_boss(cycle, boss_num, health).await,
        Command::Remind(members) => dispatcher.send_remind(members).await,
        Command::DropMembers(members) => dispatcher.drop_members(members).await,
        Command::Subscribers => {
            if let Ok(subscribers) = dispatcher.subscribers().await {
                if subscribers.is_empty() {
                    println!("no subscriptions");
                }
                for subscriber in subscribers {
                    let label = dispatcher.store().roster().label(subscriber.qqid);
                    match subscriber.boss.wire_value() {
                        0 => println!("  {label}: current boss"),
                        num => println!("  {label}: boss {num}"),
                    }
                }
            }
            return;
        }
        Command::Status | Command::Help | Command::Quit => return,
    };
}

fn print_status(store: &SharedStore) {
    let view = store.view();
    let per_mille = view.boss.health_per_mille();
    let challenger = store
        .challenger_label()
        .unwrap_or_else(|| String::from("nobody"));
    println!(
        "{} ({}.{}%) | attacking: {}",
        view.boss,
        per_mille / 10,
        per_mille % 10,
        challenger
    );
}
