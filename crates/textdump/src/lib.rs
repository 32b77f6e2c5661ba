// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// Representation of the structure of objects verbs etc as read from a LambdaMOO textdump'd db
/// file.
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub use read::{TextdumpReader, TextdumpReaderError};
use strum::{Display as StrumDisplay, FromRepr};
use transmoo_var::{Obj, Var};

mod read;

const VF_READ: u16 = 1;
const VF_WRITE: u16 = 2;
const VF_EXEC: u16 = 4;
const VF_DEBUG: u16 = 8;
const VF_DOBJSHIFT: u16 = 4;
const VF_IOBJSHIFT: u16 = 6;
const VF_OBJMASK: u16 = 0x3;

const PREP_ANY: i16 = -2;
const PREP_NONE: i16 = -1;

/// LambdaMOO's preposition table, indexed by the `prep` field of a verbdef.
const PREPOSITIONS: &[&str] = &[
    "with/using",
    "at/to",
    "in front of",
    "in/inside/into",
    "on top of/on/onto/upon",
    "out of/from inside/from",
    "over",
    "through",
    "under/underneath/beneath",
    "behind",
    "beside",
    "for/about",
    "is",
    "as",
    "off/off of",
];

/// Versions corresponding to LambdaMOO's version.h
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, StrumDisplay, Ord, PartialOrd, Copy, Clone, FromRepr)]
pub enum LambdaMOODBVersion {
    DbvPrehistory = 0, // Before format versions
    DbvExceptions = 1, // Addition of the `try', `except', `finally', and `endtry' keywords.
    DbvBreakCont = 2,  // Addition of the `break' and `continue' keywords.
    DbvFloat = 3, // Addition of `FLOAT' and `INT' variables and the `E_FLOAT' keyword, along with version numbers on each frame of a suspended task.
    DbvBfbugFixed = 4, // Bug in built-in function overrides fixed by making it use tail-calling. This DB_Version change exists solely to turn off special bug handling in read_bi_func_data().
}

const VERSION_PREFIX: &str = "** LambdaMOO Database, Format Version ";

impl LambdaMOODBVersion {
    pub fn parse(s: &str) -> Option<LambdaMOODBVersion> {
        let version = s.strip_prefix(VERSION_PREFIX)?.trim_end_matches(" **");
        let version = version.parse::<u16>().ok()?;
        LambdaMOODBVersion::from_repr(version)
    }

    pub fn to_version_string(&self) -> String {
        format!("{VERSION_PREFIX}{} **", *self as u16)
    }
}

/// What a verb accepts in its direct or indirect object slot.
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, Copy, Clone, FromRepr, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum ArgSpec {
    None = 0,
    Any = 1,
    This = 2,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct VerbArgsSpec {
    pub dobj: ArgSpec,
    pub prep: i16,
    pub iobj: ArgSpec,
}

impl VerbArgsSpec {
    pub fn prep_name(&self) -> &'static str {
        match self.prep {
            PREP_ANY => "any",
            PREP_NONE => "none",
            p => usize::try_from(p)
                .ok()
                .and_then(|p| PREPOSITIONS.get(p).copied())
                .unwrap_or("none"),
        }
    }
}

impl Display for VerbArgsSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.dobj, self.prep_name(), self.iobj)
    }
}

#[derive(Clone, Debug)]
pub struct Verbdef {
    pub name: String,
    pub owner: Obj,
    pub flags: u16,
    pub prep: i16,
}

impl Verbdef {
    /// The space-separated names a verb answers to. The first is its primary name.
    pub fn names(&self) -> Vec<&str> {
        self.name.split_whitespace().collect()
    }

    pub fn primary_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.name.split_whitespace().skip(1).collect()
    }

    /// Permission bits in the form `verb_info` shows them, e.g. `rxd`.
    pub fn perms_string(&self) -> String {
        [(VF_READ, 'r'), (VF_WRITE, 'w'), (VF_EXEC, 'x'), (VF_DEBUG, 'd')]
            .iter()
            .filter(|(bit, _)| self.flags & bit != 0)
            .map(|(_, c)| c)
            .collect()
    }

    pub fn args(&self) -> VerbArgsSpec {
        let slot = |shift: u16| {
            ArgSpec::from_repr((self.flags >> shift) & VF_OBJMASK).unwrap_or(ArgSpec::None)
        };
        VerbArgsSpec {
            dobj: slot(VF_DOBJSHIFT),
            prep: self.prep,
            iobj: slot(VF_IOBJSHIFT),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Propval {
    pub value: Var,
    pub owner: Obj,
    pub flags: u8,
    pub is_clear: bool,
}

#[derive(Debug)]
pub struct Object {
    pub id: Obj,
    pub owner: Obj,
    pub location: Obj,
    pub contents: Obj,
    pub next: Obj,
    pub parent: Obj,
    pub child: Obj,
    pub sibling: Obj,
    pub name: String,
    pub flags: u8,
    pub verbdefs: Vec<Verbdef>,
    pub propdefs: Vec<String>,
    pub propvals: Vec<Propval>,
}

#[derive(Clone, Debug)]
pub struct Verb {
    pub objid: Obj,
    pub verbnum: usize,
    pub program: String,
    pub start_line: usize,
}

pub struct Textdump {
    pub version: LambdaMOODBVersion,
    pub version_string: String,
    pub objects: BTreeMap<Obj, Object>,
    pub users: Vec<Obj>,
    pub verbs: BTreeMap<(Obj, usize), Verb>,
}

impl Textdump {
    /// The verbdef a program belongs to, if its object survived loading.
    pub fn verbdef(&self, verb: &Verb) -> Option<&Verbdef> {
        self.objects
            .get(&verb.objid)
            .and_then(|o| o.verbdefs.get(verb.verbnum))
    }
}

pub fn read_textdump(path: &Path) -> Result<Textdump, TextdumpReaderError> {
    let file = File::open(path)
        .map_err(|e| TextdumpReaderError::CouldNotOpenFile(format!("{}: {e}", path.display())))?;
    let mut reader = TextdumpReader::new(BufReader::new(file))?;
    reader.read_textdump()
}

#[cfg(test)]
mod tests {
    use super::*;
    use transmoo_var::NOTHING;

    fn verbdef(name: &str, flags: u16, prep: i16) -> Verbdef {
        Verbdef {
            name: name.to_string(),
            owner: NOTHING,
            flags,
            prep,
        }
    }

    #[test]
    fn parse_textdump_version_lambda() {
        let version = LambdaMOODBVersion::parse("** LambdaMOO Database, Format Version 4 **");
        assert_eq!(version, Some(LambdaMOODBVersion::DbvBfbugFixed));
        assert_eq!(
            LambdaMOODBVersion::DbvFloat.to_version_string(),
            "** LambdaMOO Database, Format Version 3 **"
        );
        assert_eq!(
            LambdaMOODBVersion::parse("** LambdaMOO Database, Format Version 17 **"),
            None
        );
        assert_eq!(LambdaMOODBVersion::parse("Moor 0.1.0"), None);
    }

    #[test]
    fn test_verb_names() {
        let v = verbdef("look l*ook examine", 0, PREP_NONE);
        assert_eq!(v.names(), vec!["look", "l*ook", "examine"]);
        assert_eq!(v.primary_name(), "look");
        assert_eq!(v.aliases(), vec!["l*ook", "examine"]);
        assert!(verbdef("tell", 0, PREP_NONE).aliases().is_empty());
    }

    #[test]
    fn test_verb_perms() {
        assert_eq!(verbdef("x", 173, PREP_NONE).perms_string(), "rxd");
        assert_eq!(verbdef("x", 0xf, PREP_NONE).perms_string(), "rwxd");
        assert_eq!(verbdef("x", 0, PREP_NONE).perms_string(), "");
    }

    #[test]
    fn test_verb_args() {
        assert_eq!(
            verbdef("x", 173, PREP_NONE).args().to_string(),
            "this none this"
        );
        assert_eq!(verbdef("x", 29, PREP_ANY).args().to_string(), "any any none");
        assert_eq!(verbdef("x", 0, 1).args().to_string(), "none at/to none");
    }
}
