/// Output buffer with indentation tracking.
pub struct Emitter {
    output: String,
    indent_level: usize,
    indent_str: String,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: "\t".to_string(),
        }
    }

    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    pub fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// An empty line, unless the output already ends with one or nothing
    /// has been written yet.
    pub fn blank_line(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with("\n\n") {
            self.output.push('\n');
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    pub fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(&self.indent_str);
        }
    }

    pub fn write_indented(&mut self, s: &str) {
        self.write_indent();
        self.writeln(s);
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation_uses_tabs() {
        let mut emitter = Emitter::new();
        emitter.writeln("{");
        emitter.indent();
        emitter.write_indented("x");
        emitter.dedent();
        emitter.write_indented("}");
        assert_eq!(emitter.take_output(), "{\n\tx\n}\n");
    }

    #[test]
    fn test_indent_level_tracks_nesting() {
        let mut emitter = Emitter::new();
        emitter.indent();
        emitter.indent();
        emitter.dedent();
        assert_eq!(emitter.indent_level(), 1);
        emitter.dedent();
        emitter.dedent();
        assert_eq!(emitter.indent_level(), 0);
    }

    #[test]
    fn test_blank_lines_do_not_stack() {
        let mut emitter = Emitter::new();
        emitter.blank_line();
        emitter.writeln("a");
        emitter.blank_line();
        emitter.blank_line();
        emitter.writeln("b");
        assert_eq!(emitter.take_output(), "a\n\nb\n");
    }
}
