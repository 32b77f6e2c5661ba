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

//! Global registry of built-in function names.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::names::mangle_attr;

lazy_static! {
    pub static ref BUILTIN_DESCRIPTORS: Vec<Builtin> = mk_builtin_table();
    static ref BUILTINS_BY_NAME: HashMap<&'static str, usize> = BUILTIN_DESCRIPTORS
        .iter()
        .enumerate()
        .map(|(i, b)| (b.name, i))
        .collect();
}

pub struct Builtin {
    pub name: &'static str,
    /// The attribute of the runtime module that implements it.
    pub target: String,
}

impl Builtin {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            target: mangle_attr(name),
        }
    }

    fn renamed(name: &'static str, target: &str) -> Self {
        Self {
            name,
            target: target.to_string(),
        }
    }
}

// The LambdaMOO 1.8 function set.
const BUILTIN_NAMES: &[&str] = &[
    // values
    "typeof", "toint", "tonum", "tofloat", "toobj", "toliteral", "equal", "value_bytes",
    "value_hash", "string_hash", "binary_hash", "decode_binary", "encode_binary",
    // numbers
    "random", "min", "max", "abs", "floatstr", "sqrt", "sin", "cos", "tan", "asin", "acos",
    "atan", "sinh", "cosh", "tanh", "exp", "log", "log10", "ceil", "floor", "trunc",
    // strings
    "length", "strsub", "index", "rindex", "strcmp", "crypt", "match", "rmatch", "substitute",
    // lists
    "is_member", "listinsert", "listappend", "listdelete", "listset", "setadd", "setremove",
    // objects
    "create", "chparent", "valid", "parent", "children", "recycle", "max_object", "move",
    "players", "is_player", "set_player_flag", "object_bytes", "renumber", "reset_max_object",
    // properties
    "properties", "property_info", "set_property_info", "add_property", "delete_property",
    "clear_property", "is_clear_property",
    // verbs
    "verbs", "verb_info", "set_verb_info", "verb_args", "set_verb_args", "add_verb",
    "delete_verb", "verb_code", "set_verb_code", "disassemble", "eval",
    // network
    "connected_players", "connected_seconds", "idle_seconds", "notify", "buffered_output_length",
    "read", "force_input", "flush_input", "output_delimiters", "boot_player", "connection_name",
    "set_connection_option", "connection_option", "connection_options", "listen", "unlisten",
    "listeners", "open_network_connection",
    // tasks
    "time", "ctime", "raise", "suspend", "resume", "queue_info", "queued_tasks", "kill_task",
    "seconds_left", "ticks_left", "task_id", "task_stack", "callers", "caller_perms",
    "set_task_perms", "pass", "call_function", "function_info",
    // server
    "server_version", "server_log", "shutdown", "dump_database", "db_disk_size", "memory_usage",
];

fn mk_builtin_table() -> Vec<Builtin> {
    BUILTIN_NAMES
        .iter()
        .map(|name| Builtin::new(*name))
        .chain(std::iter::once(Builtin::renamed("tostr", "String")))
        .collect()
}

/// Look up a builtin by the name used at a call site. LambdaMOO resolves function names without
/// regard to case.
pub fn find_builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS_BY_NAME
        .get(name.to_ascii_lowercase().as_str())
        .and_then(|i| BUILTIN_DESCRIPTORS.get(*i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(find_builtin("notify").unwrap().target, "notify");
        assert_eq!(find_builtin("NOTIFY").unwrap().name, "notify");
        assert_eq!(find_builtin("tostr").unwrap().target, "String");
        assert!(find_builtin("frobnicate").is_none());
    }

    #[test]
    fn test_keyword_names_are_mangled() {
        assert_eq!(find_builtin("pass").unwrap().target, "pass_");
        assert_eq!(find_builtin("raise").unwrap().target, "raise_");
    }

    #[test]
    fn test_names_are_unique() {
        assert_eq!(BUILTINS_BY_NAME.len(), BUILTIN_DESCRIPTORS.len());
    }
}
