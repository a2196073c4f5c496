use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    sync::{Arc, Mutex},
};

use once_cell::sync::Lazy;

use crate::ast::Ident;

static SYMBOL_GLOBAL: Lazy<Mutex<SymbolGlobal>> = Lazy::new(|| Mutex::new(SymbolGlobal::default()));

#[derive(Debug, Default)]
struct SymbolGlobal {
    count: u32,
    table: HashMap<Arc<String>, SymbolIndex>,
    name: Vec<Arc<String>>,
}

impl SymbolGlobal {
    fn new_symbol(&mut self, s: impl Into<String>) -> Symbol {
        let s = Arc::new(s.into());
        let idx = self.table.entry(s.clone()).or_insert_with(|| {
            let sym = SymbolIndex {
                private: self.count,
            };
            self.count += 1;
            self.name.push(s);
            sym
        });

        assert!((idx.private as usize) < self.name.len());

        Symbol(*idx)
    }

    fn name(&self, s: &Symbol) -> Arc<String> {
        self.name[s.0.private as usize].clone()
    }
}

/// Interned identifier. Symbol tables are cloned at every branch, so names
/// are kept as small `Copy` handles.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(SymbolIndex);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        SYMBOL_GLOBAL
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .new_symbol(s)
    }

    pub fn name(&self) -> Arc<String> {
        SYMBOL_GLOBAL
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .name(self)
    }

    #[cfg(test)]
    fn as_u32(&self) -> u32 {
        self.0.private
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(index: {}, name: {})", self.0.private, self.name())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&Ident> for Symbol {
    fn from(id: &Ident) -> Self {
        Self::new(&id.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
struct SymbolIndex {
    private: u32,
}
