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

use std::io::Write;

use tracing::{debug, error, warn};
use transmoo_compiler::{CompileOptions, compile};
use transmoo_textdump::{Textdump, Verb, Verbdef};

#[derive(Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub compiled: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// `#obj:index name`, as verbs are named in diagnostics.
fn verb_ident(verb: &Verb, verbdef: &Verbdef) -> String {
    format!("{}:{} {}", verb.objid, verb.verbnum, verbdef.primary_name())
}

/// The comment block that introduces a compiled verb.
pub fn verb_header(verb: &Verb, verbdef: &Verbdef) -> String {
    let mut header = format!("# {}\n", verb_ident(verb, verbdef));
    let aliases = verbdef.aliases();
    if !aliases.is_empty() {
        header.push_str(&format!("# aliases: {}\n", aliases.join(" ")));
    }
    header.push_str(&format!(
        "# owner: {}, perms: {}, args: {}\n",
        verbdef.owner,
        verbdef.perms_string(),
        verbdef.args()
    ));
    header
}

/// Compile every verb program in the dump, writing each one that succeeds to `out`. A verb that
/// fails to compile is logged and left out.
pub fn emit_textdump<W: Write>(
    textdump: &Textdump,
    options: &CompileOptions,
    out: &mut W,
) -> Result<Summary, std::io::Error> {
    let mut summary = Summary::default();
    for verb in textdump.verbs.values() {
        let Some(verbdef) = textdump.verbdef(verb) else {
            warn!(
                "No verbdef for program {}:{}, skipping",
                verb.objid, verb.verbnum
            );
            summary.skipped += 1;
            continue;
        };
        let ident = verb_ident(verb, verbdef);
        match compile(&verb.program, options.clone()) {
            Ok(code) => {
                debug!("compiled {ident}");
                write!(out, "{}", verb_header(verb, verbdef))?;
                if !code.is_empty() {
                    writeln!(out, "{code}")?;
                }
                writeln!(out)?;
                summary.compiled += 1;
            }
            Err(e) => {
                // Positions in the error are relative to the verb body.
                let db_line = e.position().map(|(line, _)| verb.start_line + line - 1);
                error!(verb = %ident, ?db_line, "Failed to compile: {e}");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
