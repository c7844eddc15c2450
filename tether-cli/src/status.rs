use colored::*;
use tether_client::{SessionPhase, SessionStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Prints every status change until the session goes away.
pub fn spawn_printer(mut rx: watch::Receiver<SessionStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = rx.borrow_and_update().clone();
        print_status(&initial);
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            print_status(&status);
        }
    })
}

fn print_status(status: &SessionStatus) {
    let tag = format!("[{}]", status.phase);
    let tag = match status.phase {
        SessionPhase::Connected => tag.as_str().green().bold(),
        SessionPhase::Failed => tag.as_str().red().bold(),
        SessionPhase::PeerLeft | SessionPhase::Closed => tag.as_str().yellow(),
        _ => tag.as_str().cyan(),
    };
    println!("{} {}", tag, status.message);
}
