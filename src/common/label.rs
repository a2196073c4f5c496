use std::fmt::Display;

/// Jump target inside one method body.
///
/// Every `if`/`while` takes one number from the method's [`LabelGen`] and
/// derives all of its labels from it, so nested constructs never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    IfElse(u32),
    IfDone(u32),
    WhileCond(u32),
    WhileEnd(u32),
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::IfElse(n) => write!(f, "if_else_{}", n),
            Label::IfDone(n) => write!(f, "if_done_{}", n),
            Label::WhileCond(n) => write!(f, "while_cond_{}", n),
            Label::WhileEnd(n) => write!(f, "while_end_{}", n),
        }
    }
}

#[derive(Debug, Default)]
pub struct LabelGen {
    next: u32,
}

impl LabelGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> u32 {
        let n = self.next;
        self.next += 1;
        n
    }
}
