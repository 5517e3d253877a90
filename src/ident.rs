//! Identifiers and hygienic renaming ("coloring")
use core::fmt;
use std::rc::Rc;

/// A name that a binder introduces or a variable refers to.
///
/// Equality is structural per variant: two raw identifiers are equal when their
/// names match, two colored identifiers when both name and tag match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// A name as written in source. Only the front end produces these.
    Raw(Rc<str>),
    /// A name with no surface spelling, only a tag.
    Generated(u64),
    /// A binder after renaming. Only [`Colorer::color`] produces these.
    Colored(Rc<str>, u64),
}

impl Identifier {
    pub fn raw(name: impl AsRef<str>) -> Self {
        Self::Raw(Rc::from(name.as_ref()))
    }

    /// The surface spelling this identifier descends from (empty for generated ones).
    pub fn base_name(&self) -> &str {
        match self {
            Self::Raw(name) | Self::Colored(name, _) => name,
            Self::Generated(_) => "",
        }
    }

    pub fn tag(&self) -> Option<u64> {
        match self {
            Self::Raw(_) => None,
            Self::Generated(tag) | Self::Colored(_, tag) => Some(*tag),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(name) => write!(f, "{name}"),
            Self::Generated(tag) => write!(f, "_g{tag}"),
            Self::Colored(name, tag) if name.is_empty() => write!(f, "_@{tag}"),
            Self::Colored(name, tag) => write!(f, "{name}@{tag}"),
        }
    }
}

/// The single source of fresh tags for one run of the machine.
///
/// Every call to [`Self::color`] consumes the current counter value
/// and advances it, so no two identifiers handed out between resets share a tag.
/// The generator is owned by whoever drives the machine and threaded by `&mut`, so
/// independent runs never share it. It deliberately does not implement `Clone`.
#[derive(Debug, Default)]
pub struct Colorer {
    next: u64,
}

impl Colorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a colored identifier with `id`'s base name and a tag never issued before.
    pub fn color(&mut self, id: &Identifier) -> Identifier {
        let tag = self.bump();
        Identifier::Colored(
            match id {
                Identifier::Raw(name) | Identifier::Colored(name, _) => name.clone(),
                Identifier::Generated(_) => Rc::from(""),
            },
            tag,
        )
    }

    /// Restarts the counter from zero. Replaying the same evaluation afterwards
    /// reproduces the same tags.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// How many tags have been issued since the last reset.
    pub fn issued(&self) -> u64 {
        self.next
    }

    fn bump(&mut self) -> u64 {
        let tag = self.next;
        self.next += 1;
        tag
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use arbtest::arbtest;
    use assert2::{check, let_assert};

    use super::{Colorer, Identifier};

    #[test]
    fn raw_equality_is_by_name() {
        check!(Identifier::raw("x") == Identifier::raw("x"));
        check!(Identifier::raw("x") != Identifier::raw("y"));
        check!(Identifier::raw("x") != Identifier::Colored("x".into(), 0));
    }

    #[test]
    fn coloring_keeps_the_base_name() {
        let mut colorer = Colorer::new();
        let_assert!(Identifier::Colored(name, 0) = colorer.color(&Identifier::raw("x")));
        check!(name.as_ref() == "x");

        let recolored = colorer.color(&Identifier::Colored("x".into(), 0));
        check!(recolored == Identifier::Colored("x".into(), 1));

        let wildcard = colorer.color(&Identifier::Generated(0));
        check!(wildcard == Identifier::Colored("".into(), 2));
        check!(wildcard.base_name() == "");
    }

    #[test]
    fn display() {
        check!(Identifier::raw("abc").to_string() == "abc");
        check!(Identifier::Generated(4).to_string() == "_g4");
        check!(Identifier::Colored("abc".into(), 7).to_string() == "abc@7");
        check!(Identifier::Colored("".into(), 7).to_string() == "_@7");
    }

    #[test]
    fn colorings_never_collide_and_replay_after_reset() {
        arbtest(|u| {
            let names: Vec<String> = u.arbitrary()?;
            let mut colorer = Colorer::new();

            let first: Vec<_> = names
                .iter()
                .map(|name| colorer.color(&Identifier::raw(name)))
                .collect();
            let tags: HashSet<_> = first.iter().filter_map(Identifier::tag).collect();
            check!(tags.len() == names.len());
            check!(colorer.issued() == names.len() as u64);

            colorer.reset();
            let second: Vec<_> = names
                .iter()
                .map(|name| colorer.color(&Identifier::raw(name)))
                .collect();
            check!(first == second);
            Ok(())
        });
    }
}
