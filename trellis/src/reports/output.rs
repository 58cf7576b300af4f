//! Where reports go.
//!
//! Reports only call the semantic methods below. The layout lives in their
//! default bodies, so an implementation only decides where a finished line
//! ends up.

pub trait Output {
    /// Emit one line of regular output.
    fn line(&mut self, text: &str);

    /// Emit one line of problem output (diagnostics, faults).
    fn problem_line(&mut self, text: &str);

    fn title(&mut self, text: &str) {
        self.line(text);
        self.line(&"=".repeat(text.len()));
    }

    fn section(&mut self, name: &str) {
        self.line(&format!("{}:", name));
    }

    fn key_value(&mut self, key: &str, value: &str) {
        self.line(&format!("{}: {}", key, value));
    }

    fn key_value_indented(&mut self, key: &str, value: &str) {
        self.line(&format!("  {}: {}", key, value));
    }

    fn numbered_item(&mut self, index: usize, text: &str) {
        self.line(&format!("  {}. {}", index, text));
    }

    fn list_item(&mut self, text: &str) {
        self.line(&format!("  - {}", text));
    }

    /// A unit that compiled or an artifact that was produced.
    fn added_item(&mut self, text: &str) {
        self.line(&format!("  + {}", text));
    }

    /// A unit that failed.
    fn removed_item(&mut self, text: &str) {
        self.line(&format!("  - {}", text));
    }

    /// An already formatted diagnostic.
    fn diagnostic(&mut self, text: &str) {
        self.problem_line(text);
    }

    fn error(&mut self, msg: &str) {
        self.problem_line(&format!("error: {}", msg));
    }

    /// Text that carries its own indentation.
    fn preformatted(&mut self, text: &str) {
        self.line(text);
    }

    fn newline(&mut self) {
        self.line("");
    }
}

/// A report that can render itself to an output.
pub trait Report {
    fn render(&self, out: &mut dyn Output);
}

/// Regular lines to stdout, problems to stderr.
#[derive(Debug, Default)]
pub struct TerminalOutput;

impl Output for TerminalOutput {
    fn line(&mut self, text: &str) {
        println!("{}", text);
    }

    fn problem_line(&mut self, text: &str) {
        eprintln!("{}", text);
    }
}

/// Collects rendered lines into a string, stdout and stderr alike.
#[cfg(test)]
#[derive(Default)]
pub struct PlainOutput {
    pub text: String,
}

#[cfg(test)]
impl Output for PlainOutput {
    fn line(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }

    fn problem_line(&mut self, text: &str) {
        self.line(text);
    }
}
