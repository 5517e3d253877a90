//! The renaming environment
use im_rc::HashMap;

use crate::ident::Identifier;

/// Maps source-level (or previously colored) identifiers to the colored identifier
/// of their innermost binder. Scoped lexically: a binder extends it for its body only.
#[derive(Debug, Clone, Default)]
pub struct RenameEnv(HashMap<Identifier, Identifier>);

impl RenameEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, from: Identifier, to: Identifier) -> Self {
        Self(self.0.update(from, to))
    }

    /// The most recent renaming of `id`, if any.
    pub fn lookup(&self, id: &Identifier) -> Option<&Identifier> {
        self.0.get(id)
    }

    /// The identifier a variable occurrence refers to.
    ///
    /// A raw name must have been renamed by an enclosing binder. Generated and colored
    /// identifiers come from code built earlier and are already unique, so they stand
    /// for themselves unless a binder in that code has been entered and renamed them again.
    pub fn resolve(&self, id: &Identifier) -> Option<Identifier> {
        match self.lookup(id) {
            Some(colored) => Some(colored.clone()),
            None if id.is_raw() => None,
            None => Some(id.clone()),
        }
    }

    /// Distinct identifiers with a renaming in scope.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::RenameEnv;
    use crate::ident::Identifier;

    #[test]
    fn most_recent_binding_wins() {
        let x = Identifier::raw("x");
        let outer = RenameEnv::new().bind(x.clone(), Identifier::Colored("x".into(), 0));
        let inner = outer.bind(x.clone(), Identifier::Colored("x".into(), 1));

        check!(inner.lookup(&x) == Some(&Identifier::Colored("x".into(), 1)));
        check!(outer.lookup(&x) == Some(&Identifier::Colored("x".into(), 0)));
        check!(inner.len() == 1);
        check!(outer.bind(Identifier::raw("y"), Identifier::Colored("y".into(), 2)).len() == 2);
        check!(RenameEnv::new().is_empty());
    }

    #[test]
    fn resolve() {
        let env = RenameEnv::new();
        check!(env.resolve(&Identifier::raw("x")) == None);

        let colored = Identifier::Colored("x".into(), 3);
        check!(env.resolve(&colored) == Some(colored.clone()));
        check!(env.resolve(&Identifier::Generated(2)) == Some(Identifier::Generated(2)));

        let renamed = env.bind(colored.clone(), Identifier::Colored("x".into(), 4));
        check!(renamed.resolve(&colored) == Some(Identifier::Colored("x".into(), 4)));
    }
}
