// command line driver - one blocking conversation on stdin/stdout

use crate::Error;
use crate::core::{Event, Session, is_exit_command};
use crate::output::Output;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub async fn run(session: Session, backend: &str) -> Result<(), Error> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    drive(session, backend, stdin, &mut stdout).await
}

/// Reads lines until an exit keyword or end of input.
pub async fn drive<R, W>(
    mut session: Session,
    backend: &str,
    input: R,
    out: &mut W,
) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    Output::banner(out, backend)?;
    tracing::info!(backend, "cli session started");

    let mut lines = input.lines();
    loop {
        Output::prompt(out)?;

        let Some(line) = lines.next_line().await? else {
            // eof behaves like "exit"
            writeln!(out)?;
            break;
        };

        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let event = session.handle_turn(&line).await;
        Output::event(out, &event)?;
    }

    Output::event(out, &Event::End)?;
    tracing::info!(turns = session.history().len(), "cli session ended");
    Ok(())
}
