//! Scoped name table shared by the semantic analyzer and the virtual machine.
//! Each pass builds its own [`Store`].
//!
//! Levels are linked to their lexically enclosing level. A block level links to the level it
//! was opened in; a call frame links to the level its function was declared in, so a function
//! body never sees the locals of its caller.

use std::collections::HashMap;

use beauty_parser::ast::{Block, Param};
use beauty_parser::types::Type;

use crate::{Lvalue, Rvalue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} is already defined in this context")]
    AlreadyDefined(String),
    #[error("{0} is undefined in this context")]
    Undefined(String),
    #[error("{0} is not a variable")]
    NotVariable(String),
    #[error("{0} is not a function")]
    NotFunction(String),
    #[error("incompatible type for assignment to {0}")]
    IncompatibleType(String),
    #[error("{0} has no value")]
    Uninitialized(String),
    #[error("array index out of bounds")]
    OutOfBounds,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: Type,
    /// `None` in the analyzer, which only tracks types.
    pub value: Option<Rvalue>,
}

/// A function record. Borrows its definition from the syntax tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Function<'ast> {
    pub params: &'ast [Param],
    /// [`Type::None`] for void functions.
    pub ret_ty: &'ast Type,
    pub body: &'ast Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry<'ast> {
    Variable(Variable),
    Function(Function<'ast>),
}

/// The names visible at the point a function was declared.
/// Pass it to [`Store::new_frame`] when calling the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    level: usize,
    /// Bindings registered after the function are invisible to its body.
    horizon: u64,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    level: usize,
    horizon: Option<u64>,
}

#[derive(Debug)]
struct Binding<'ast> {
    /// Registration order, unique within the store.
    id: u64,
    entry: Entry<'ast>,
}

#[derive(Debug, Default)]
struct Level<'ast> {
    bindings: HashMap<String, Binding<'ast>>,
    parent: Option<Link>,
}

/// A stack of scope levels. Names are unique within one level and shadow outer levels.
#[derive(Debug)]
pub struct Store<'ast> {
    levels: Vec<Level<'ast>>,
    next_id: u64,
}

impl<'ast> Store<'ast> {
    /// Create a new `Store` holding a single (global) level.
    pub fn new() -> Self {
        Self {
            levels: vec![Level::default()],
            next_id: 0,
        }
    }

    /// Opens a level nested in the innermost one.
    pub fn new_level(&mut self) {
        let parent = self.levels.len().checked_sub(1).map(|level| Link {
            level,
            horizon: None,
        });
        self.push_level(parent);
    }

    /// Opens the level of a function call, nested in the level the function was declared in.
    pub fn new_frame(&mut self, scope: Scope) {
        self.push_level(Some(Link {
            level: scope.level,
            horizon: Some(scope.horizon),
        }));
    }

    fn push_level(&mut self, parent: Option<Link>) {
        self.levels.push(Level {
            bindings: HashMap::new(),
            parent,
        });
        tracing::trace!(depth = self.levels.len(), "new scope level");
    }

    /// Drops the innermost level with all its bindings.
    pub fn delete_level(&mut self) {
        self.levels.pop();
        tracing::trace!(depth = self.levels.len(), "deleted scope level");
    }

    /// Number of levels, including the global one.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Inserts `entry` into the innermost level.
    pub fn register_name(&mut self, name: &str, entry: Entry<'ast>) -> StoreResult<()> {
        if self.levels.is_empty() {
            self.levels.push(Level::default());
        }
        let innermost = self.levels.len() - 1;
        let level = &mut self.levels[innermost];
        if level.bindings.contains_key(name) {
            return Err(StoreError::AlreadyDefined(name.to_string()));
        }
        level.bindings.insert(
            name.to_string(),
            Binding {
                id: self.next_id,
                entry,
            },
        );
        self.next_id += 1;
        Ok(())
    }

    pub fn register_variable(
        &mut self,
        name: &str,
        ty: Type,
        value: Option<Rvalue>,
    ) -> StoreResult<()> {
        self.register_name(name, Entry::Variable(Variable { ty, value }))
    }

    pub fn register_function(&mut self, name: &str, function: Function<'ast>) -> StoreResult<()> {
        self.register_name(name, Entry::Function(function))
    }

    /// Finds the innermost visible binding of `name` and the index of its level.
    fn lookup(&self, name: &str) -> StoreResult<(usize, &Binding<'ast>)> {
        let undefined = || StoreError::Undefined(name.to_string());
        let mut index = self.levels.len().checked_sub(1).ok_or_else(undefined)?;
        let mut horizon: Option<u64> = None;
        loop {
            let level = &self.levels[index];
            if let Some(binding) = level.bindings.get(name) {
                if horizon.map_or(true, |horizon| binding.id <= horizon) {
                    return Ok((index, binding));
                }
            }
            let link = level.parent.ok_or_else(undefined)?;
            index = link.level;
            horizon = match (horizon, link.horizon) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
    }

    pub fn lookup_variable(&self, name: &str) -> StoreResult<&Variable> {
        match self.lookup(name)? {
            (_, Binding {
                entry: Entry::Variable(variable),
                ..
            }) => Ok(variable),
            _ => Err(StoreError::NotVariable(name.to_string())),
        }
    }

    /// Returns the function bound to `name` and the scope its body runs in.
    pub fn lookup_function(&self, name: &str) -> StoreResult<(Function<'ast>, Scope)> {
        match self.lookup(name)? {
            (level, Binding {
                id,
                entry: Entry::Function(function),
            }) => Ok((
                *function,
                Scope {
                    level,
                    horizon: *id,
                },
            )),
            _ => Err(StoreError::NotFunction(name.to_string())),
        }
    }

    /// Resolves `name` to an [`Lvalue`] pinned to the level it is bound in.
    pub fn resolve(&self, name: &str) -> StoreResult<Lvalue> {
        match self.lookup(name)? {
            (level, Binding {
                entry: Entry::Variable(_),
                ..
            }) => Ok(Lvalue {
                level,
                name: name.to_string(),
                path: Vec::new(),
            }),
            _ => Err(StoreError::NotVariable(name.to_string())),
        }
    }

    fn variable(&self, lvalue: &Lvalue) -> StoreResult<&Variable> {
        let binding = self
            .levels
            .get(lvalue.level)
            .and_then(|level| level.bindings.get(&lvalue.name));
        match binding.map(|binding| &binding.entry) {
            Some(Entry::Variable(variable)) => Ok(variable),
            Some(Entry::Function(_)) => Err(StoreError::NotVariable(lvalue.name.clone())),
            None => Err(StoreError::Undefined(lvalue.name.clone())),
        }
    }

    fn variable_mut(&mut self, lvalue: &Lvalue) -> StoreResult<&mut Variable> {
        let binding = self
            .levels
            .get_mut(lvalue.level)
            .and_then(|level| level.bindings.get_mut(&lvalue.name));
        match binding.map(|binding| &mut binding.entry) {
            Some(Entry::Variable(variable)) => Ok(variable),
            Some(Entry::Function(_)) => Err(StoreError::NotVariable(lvalue.name.clone())),
            None => Err(StoreError::Undefined(lvalue.name.clone())),
        }
    }

    /// Returns the value the slot currently holds.
    pub fn load(&self, lvalue: &Lvalue) -> StoreResult<&Rvalue> {
        let variable = self.variable(lvalue)?;
        let mut slot = variable
            .value
            .as_ref()
            .ok_or_else(|| StoreError::Uninitialized(lvalue.name.clone()))?;
        for &index in &lvalue.path {
            slot = match slot {
                Rvalue::Array(array) => array.items.get(index).ok_or(StoreError::OutOfBounds)?,
                _ => return Err(StoreError::OutOfBounds),
            };
        }
        Ok(slot)
    }

    /// Replaces the content of the slot with `value`, coerced to the slot type.
    pub fn store(&mut self, lvalue: &Lvalue, value: Rvalue) -> StoreResult<()> {
        let Variable { ty, value: slot } = self.variable_mut(lvalue)?;
        let mut target = ty.clone();
        if slot.is_none() && lvalue.path.is_empty() {
            let value = value
                .coerce(&target)
                .ok_or_else(|| StoreError::IncompatibleType(lvalue.name.clone()))?;
            *slot = Some(value);
            return Ok(());
        }
        let mut slot = slot
            .as_mut()
            .ok_or_else(|| StoreError::Uninitialized(lvalue.name.clone()))?;

        for &index in &lvalue.path {
            slot = match slot {
                Rvalue::Array(array) => {
                    target = array.element.clone();
                    array.items.get_mut(index).ok_or(StoreError::OutOfBounds)?
                }
                _ => return Err(StoreError::OutOfBounds),
            };
        }

        *slot = value
            .coerce(&target)
            .ok_or_else(|| StoreError::IncompatibleType(lvalue.name.clone()))?;
        Ok(())
    }
}

impl<'ast> Default for Store<'ast> {
    fn default() -> Self {
        Self::new()
    }
}
