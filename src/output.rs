// output formatting - how session events look in a terminal

use crate::core::Event;
use std::io::{self, Write};

pub struct Output;

impl Output {
    pub fn banner(out: &mut impl Write, backend: &str) -> io::Result<()> {
        writeln!(
            out,
            "Welcome to the chatbot with moderation ({backend}). Type 'exit' to quit."
        )
    }

    pub fn prompt(out: &mut impl Write) -> io::Result<()> {
        write!(out, "You: ")?;
        out.flush()
    }

    pub fn event(out: &mut impl Write, event: &Event) -> io::Result<()> {
        match event {
            Event::Warning(text) => writeln!(out, "Warning: {text}"),
            // blank line after each reply so turns are easy to tell apart
            Event::Reply(text) => writeln!(out, "Assistant: {text}\n"),
            Event::End => writeln!(out, "Goodbye!"),
        }
    }
}
