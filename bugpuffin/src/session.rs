use greypuffin::execution::Target;
use greypuffin::step;
use log::trace;

/// One byte of the input per command, unknown bytes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Open,
    Write,
    Read,
    Flush,
    Close,
}

impl Command {
    pub fn parse(c: char) -> Option<Self> {
        match c {
            'o' => Some(Command::Open),
            'w' => Some(Command::Write),
            'r' => Some(Command::Read),
            'f' => Some(Command::Flush),
            'c' => Some(Command::Close),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub commands: usize,
    pub rejected: usize,
    pub flushed: usize,
}

#[derive(Debug, Default)]
struct Session {
    open: bool,
    buffer: Vec<u8>,
    pending: usize,
    /// Size of a buffer that was dropped while still holding unflushed data
    leaked: Option<usize>,
    summary: Summary,
}

impl Session {
    fn open(&mut self) {
        step!();
        if self.open {
            step!();
            self.summary.rejected += 1;
            return;
        }
        if let Some(len) = self.leaked {
            step!();
            // The stale buffer is handed out again
            panic!("reopened session on top of {} leaked bytes", len);
        }
        self.open = true;
        self.buffer.clear();
    }

    fn write(&mut self, byte: u8) {
        step!();
        if !self.open {
            step!();
            self.summary.rejected += 1;
            return;
        }
        self.buffer.push(byte);
        self.pending += 1;
    }

    fn read(&mut self) {
        step!();
        if !self.open || self.buffer.is_empty() {
            step!();
            self.summary.rejected += 1;
            return;
        }
        self.buffer.pop();
        self.pending = self.pending.saturating_sub(1);
    }

    fn flush(&mut self) {
        step!();
        if self.pending > 0 {
            step!();
            self.summary.flushed += self.pending;
            self.pending = 0;
        }
    }

    fn close(&mut self) {
        step!();
        if !self.open {
            step!();
            self.summary.rejected += 1;
            return;
        }
        if self.pending > 0 {
            step!();
            self.leaked = Some(self.buffer.len());
        }
        self.open = false;
        self.pending = 0;
    }
}

/// Runs the commands of the input against a fresh session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionTarget;

impl Target for SessionTarget {
    type Input = String;
    type Output = Summary;

    fn entrypoint(&self, input: &String) -> Result<Summary, anyhow::Error> {
        let mut session = Session::default();

        for c in input.chars() {
            let Some(command) = Command::parse(c) else {
                step!("skip");
                continue;
            };
            session.summary.commands += 1;
            match command {
                Command::Open => session.open(),
                Command::Write => session.write(c as u8),
                Command::Read => session.read(),
                Command::Flush => session.flush(),
                Command::Close => session.close(),
            }
        }

        trace!("Session finished: {:?}", session.summary);
        Ok(session.summary)
    }

    fn initial_corpus(&self) -> Vec<String> {
        vec!["orwfco".to_string()]
    }
}
