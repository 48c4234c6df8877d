//! Fully-qualified names: the sole identity of every global (type, function,
//! module-level variable) manipulated by the VM.
//!
//! Grounded on `examples/original_source/spy/tests/test_fqn.py`, which pins
//! the exact textual grammar this module parses and prints:
//!
//! ```text
//! pkg.sub::name[q1, q2]::child        -- ordinary qualified name
//! aaa::bbb#0                          -- specialization suffix (see `make`)
//! ```
//!
//! Two FQNs are equal iff their parts and suffix are equal; `Fqn` is
//! therefore safe to use as a hash map key for the VM's global table and the
//! specialized-type memoization cache (spec.md §3, "Invariant: any two
//! globals with the same FQN are the same object").

use std::fmt;

/// One segment of a dotted/qualified name, e.g. the `b[x, y]` in `a::b[x, y]::c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NsPart {
    pub symbol: String,
    pub quals: Vec<Fqn>,
}

impl NsPart {
    fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quals: Vec::new(),
        }
    }
}

/// A structured, hashable, round-trippable identifier.
///
/// `Fqn::parts` is never empty: even a bare `"aaa"` is one part with no
/// qualifiers. `suffix` is non-empty only for FQNs produced by
/// [`Fqn::make`], used to disambiguate otherwise-identical specializations
/// (see `vm::Vm::ensure_type_fqn`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqn {
    parts: Vec<NsPart>,
    suffix: String,
}

/// Error returned when a textual FQN fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FqnParseError(pub String);

impl fmt::Display for FqnParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid FQN syntax: {}", self.0)
    }
}

impl std::error::Error for FqnParseError {}

impl Fqn {
    /// Parses `pkg.sub::name[q1, q2]::child` into its constituent parts.
    pub fn parse(s: &str) -> Result<Self, FqnParseError> {
        let (body, suffix) = match s.rfind('#') {
            Some(idx) => (&s[..idx], s[idx + 1..].to_string()),
            None => (s, String::new()),
        };
        if body.is_empty() {
            return Err(FqnParseError(s.to_string()));
        }
        let part_strs = split_top_level(body, "::");
        let mut parts = Vec::with_capacity(part_strs.len());
        for p in part_strs {
            parts.push(parse_part(&p)?);
        }
        Ok(Self { parts, suffix })
    }

    /// Builds a single-part FQN from its module path (no `::`, no qualifiers).
    #[must_use]
    pub fn module(name: impl Into<String>) -> Self {
        Self {
            parts: vec![NsPart::new(name)],
            suffix: String::new(),
        }
    }

    /// `FQN.make(base, suffix)`: parses `base`, then attaches a `#suffix`
    /// disambiguator. Used when two distinct specializations would
    /// otherwise collide on the same structural FQN.
    pub fn make(base: &str, suffix: &str) -> Result<Self, FqnParseError> {
        let mut fqn = Self::parse(base)?;
        fqn.suffix = suffix.to_string();
        Ok(fqn)
    }

    /// Appends a child part, e.g. `a.join("b", [])` -> `a::b`,
    /// `a.join("b", [i32_fqn])` -> `a::b[i32]`.
    #[must_use]
    pub fn join(&self, name: &str, quals: Vec<Fqn>) -> Self {
        let mut parts = self.parts.clone();
        parts.push(NsPart {
            symbol: name.to_string(),
            quals,
        });
        Self {
            parts,
            suffix: self.suffix.clone(),
        }
    }

    /// The leading dotted module path, e.g. `"a.b.c"` for `a.b.c::xxx`.
    #[must_use]
    pub fn modname(&self) -> &str {
        &self.parts[0].symbol
    }

    /// The bare symbol name of the last part, e.g. `"xxx"` for `a.b.c::xxx`
    /// or `"b"` for `a::b[x, y]`.
    #[must_use]
    pub fn symbol_name(&self) -> &str {
        &self.parts.last().expect("Fqn always has >= 1 part").symbol
    }

    #[must_use]
    pub fn parts(&self) -> &[NsPart] {
        &self.parts
    }

    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Full textual form, round-trippable via [`Fqn::parse`].
    #[must_use]
    pub fn fullname(&self) -> String {
        self.to_string()
    }

    /// Deterministic C identifier, matching `^[A-Za-z_][A-Za-z0-9_$]*$`.
    ///
    /// `.` -> `_`, `::` -> `$`, the qualifier list `[a, b]` -> `__a_b`, and
    /// an empty suffix omits the trailing `$suffix` entirely.
    #[must_use]
    pub fn c_name(&self) -> String {
        let mut out = String::from("spy_");
        out.push_str(&mangle_body(self));
        out
    }
}

fn mangle_body(fqn: &Fqn) -> String {
    let mut segments: Vec<String> = fqn.parts.iter().map(mangle_part).collect();
    if !fqn.suffix.is_empty() {
        segments.push(fqn.suffix.clone());
    }
    segments.join("$")
}

fn mangle_part(part: &NsPart) -> String {
    let mut out = part.symbol.replace('.', "_");
    if !part.quals.is_empty() {
        out.push_str("__");
        let mangled: Vec<String> = part.quals.iter().map(mangle_body).collect();
        out.push_str(&mangled.join("_"));
    }
    out
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(&part.symbol)?;
            if !part.quals.is_empty() {
                f.write_str("[")?;
                for (j, q) in part.quals.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{q}")?;
                }
                f.write_str("]")?;
            }
        }
        if !self.suffix.is_empty() {
            write!(f, "#{}", self.suffix)?;
        }
        Ok(())
    }
}

fn parse_part(p: &str) -> Result<NsPart, FqnParseError> {
    if let Some(bracket_pos) = p.find('[') {
        if !p.ends_with(']') {
            return Err(FqnParseError(p.to_string()));
        }
        let symbol = p[..bracket_pos].to_string();
        if symbol.is_empty() {
            return Err(FqnParseError(p.to_string()));
        }
        let inner = &p[bracket_pos + 1..p.len() - 1];
        let qual_strs = split_top_level(inner, ",");
        let mut quals = Vec::with_capacity(qual_strs.len());
        for q in qual_strs {
            quals.push(Fqn::parse(q.trim())?);
        }
        Ok(NsPart { symbol, quals })
    } else {
        if p.is_empty() {
            return Err(FqnParseError(p.to_string()));
        }
        Ok(NsPart::new(p))
    }
}

/// Splits `s` on `sep` at bracket-depth 0, so `"x, list[a, b]"` split on
/// `","` yields `["x", " list[a, b]"]` rather than splitting inside `[]`.
fn split_top_level(s: &str, sep: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let sep_chars: Vec<char> = sep.chars().collect();
    let mut depth = 0i32;
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '[' => {
                depth += 1;
                cur.push('[');
                i += 1;
            }
            ']' => {
                depth -= 1;
                cur.push(']');
                i += 1;
            }
            _ if depth == 0 && chars[i..].starts_with(sep_chars.as_slice()) => {
                parts.push(std::mem::take(&mut cur));
                i += sep_chars.len();
            }
            c => {
                cur.push(c);
                i += 1;
            }
        }
    }
    parts.push(cur);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqn_init_fullname() {
        let a = Fqn::parse("a.b.c::xxx").unwrap();
        assert_eq!(a.fullname(), "a.b.c::xxx");
        assert_eq!(a.modname(), "a.b.c");
        assert_eq!(a.parts(), &[NsPart::new("a.b.c"), NsPart::new("xxx")]);
    }

    #[test]
    fn many_fqns() {
        assert_eq!(Fqn::parse("aaa").unwrap().to_string(), "aaa");
        assert_eq!(Fqn::parse("aaa::bbb::ccc").unwrap().to_string(), "aaa::bbb::ccc");
    }

    #[test]
    fn hash_eq() {
        let a = Fqn::parse("aaa::bbb").unwrap();
        let b = Fqn::parse("aaa::bbb").unwrap();
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn qualifiers() {
        let a = Fqn::parse("a::b[x, y]::c").unwrap();
        assert_eq!(a.fullname(), "a::b[x, y]::c");
        assert_eq!(a.modname(), "a");
        assert_eq!(
            a.parts(),
            &[
                NsPart::new("a"),
                NsPart {
                    symbol: "b".into(),
                    quals: vec![Fqn::parse("x").unwrap(), Fqn::parse("y").unwrap()]
                },
                NsPart::new("c"),
            ]
        );
    }

    #[test]
    fn nested_qualifiers() {
        let a = Fqn::parse("mod::dict[str, unsafe::ptr[mymod::Point]]").unwrap();
        assert_eq!(a.fullname(), "mod::dict[str, unsafe::ptr[mymod::Point]]");
    }

    #[test]
    fn join() {
        let a = Fqn::parse("a").unwrap();
        let b = a.join("b", vec![]);
        assert_eq!(b.fullname(), "a::b");
        let c = b.join("c", vec![Fqn::parse("i32").unwrap()]);
        assert_eq!(c.fullname(), "a::b::c[i32]");
        let d = a.join("d", vec![Fqn::parse("mod::x").unwrap()]);
        assert_eq!(d.fullname(), "a::d[mod::x]");
    }

    #[test]
    fn make_and_suffix() {
        let a = Fqn::make("aaa::bbb", "0").unwrap();
        assert_eq!(a.fullname(), "aaa::bbb#0");
        assert_eq!(a.c_name(), "spy_aaa$bbb$0");
        let b = Fqn::make("aaa::bbb", "").unwrap();
        assert_eq!(b.to_string(), "aaa::bbb");
        assert_eq!(b.c_name(), "spy_aaa$bbb");
    }

    #[test]
    fn make_hash_eq() {
        let a = Fqn::make("aaa::bbb", "0").unwrap();
        let b = Fqn::make("aaa::bbb", "0").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn c_name_dotted() {
        let a = Fqn::make("a.b.c::xxx", "0").unwrap();
        assert_eq!(a.c_name(), "spy_a_b_c$xxx$0");
    }

    #[test]
    fn qualifiers_c_name() {
        let a = Fqn::make("a::b[x, y]::c", "0").unwrap();
        assert_eq!(a.c_name(), "spy_a$b__x_y$c$0");
    }

    #[test]
    fn nested_qualifiers_c_name() {
        let a = Fqn::make("a::list[Ptr[x, y]]::c", "0").unwrap();
        assert_eq!(a.c_name(), "spy_a$list__Ptr__x_y$c$0");
    }

    #[test]
    fn c_name_matches_legal_c_identifier() {
        let a = Fqn::parse("a::b[x, y]::c").unwrap();
        let name = a.c_name();
        let mut chars = name.chars();
        let first = chars.next().unwrap();
        assert!(first.is_ascii_alphabetic() || first == '_');
        assert!(chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'));
    }

    #[test]
    fn round_trip() {
        for s in [
            "aaa",
            "aaa::bbb::ccc",
            "a::b[x, y]::c",
            "mod::dict[str, unsafe::ptr[mymod::Point]]",
        ] {
            let parsed = Fqn::parse(s).unwrap();
            assert_eq!(Fqn::parse(&parsed.fullname()).unwrap(), parsed);
        }
    }
}
