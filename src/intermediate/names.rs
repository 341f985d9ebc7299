/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::cell::Cell;
use std::fmt;

thread_local! {
    static NEXT_ID: Cell<u32> = const { Cell::new(0) };
}

/// An unbounded-namespace pseudo-register. Fresh temps are numbered from a
/// thread-local counter; fixed temps carry a caller-supplied id (used to
/// encode machine registers). Identity is the numeric id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temp(u32);

impl Temp {
    /// Generates a fresh (thread-locally unique) temp.
    pub fn fresh() -> Self {
        NEXT_ID.with(|c| {
            let id = c.get();
            c.set(id + 1);
            Temp(id)
        })
    }

    /// Makes a temp with a fixed id. The caller must avoid name clashes.
    pub fn fixed(id: u32) -> Self {
        Temp(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A symbolic code address: either a fresh anonymous label or a named one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Anon(Temp),
    Named(String),
}

impl Label {
    /// Generates a fresh anonymous label, drawing from the temp counter.
    pub fn fresh() -> Self {
        Label::Anon(Temp::fresh())
    }

    /// A label with a fixed name, emitted verbatim.
    pub fn named(name: impl Into<String>) -> Self {
        Label::Named(name.into())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Anon(t) => write!(f, "L{}", t.id()),
            Label::Named(s) => f.write_str(s),
        }
    }
}

/// Resets the thread-local name counter. Called at the start of each
/// compilation unit so that generated names are reproducible.
pub fn reset() {
    NEXT_ID.with(|c| c.set(0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_temps_are_distinct_and_increasing() {
        let a = Temp::fresh();
        let b = Temp::fresh();
        assert_ne!(a, b);
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_fixed_temp_has_given_id() {
        let t = Temp::fixed(3);
        assert_eq!(t.id(), 3);
        assert_eq!(t, Temp::fixed(3));
    }

    #[test]
    fn test_label_equality_follows_variant() {
        let t = Temp::fresh();
        assert_eq!(Label::Anon(t), Label::Anon(t));
        assert_eq!(Label::named("Lmain"), Label::named("Lmain"));
        assert_ne!(Label::named("Lmain"), Label::named("L_halloc"));
        // A named label never equals an anonymous one, even if the
        // rendered forms were made to coincide.
        assert_ne!(Label::named(format!("L{}", t.id())), Label::Anon(t));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Temp::fixed(7).to_string(), "t7");
        assert_eq!(Label::Anon(Temp::fixed(7)).to_string(), "L7");
        assert_eq!(Label::named("LFac$nthFac").to_string(), "LFac$nthFac");
    }
}
