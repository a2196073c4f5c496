use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Position {
    pub(crate) line: u32,
    pub(crate) column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Start and end of a syntax node.
pub type Positions = (Position, Position);

pub fn span(start: (u32, u32), end: (u32, u32)) -> Positions {
    (Position::new(start.0, start.1), Position::new(end.0, end.1))
}
