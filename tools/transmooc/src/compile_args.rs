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

use clap_derive::Parser;
use transmoo_compiler::CompileOptions;

#[derive(Parser, Debug, Default)]
pub struct CompileArgs {
    #[arg(
        long,
        help = "Abort a verb on characters the tokenizer does not recognize. \
                When off, they are logged and skipped."
    )]
    pub strict_lexing: Option<bool>,

    #[arg(
        long,
        help = "Abort a verb that catches an error code with no known exception category. \
                When off, such handlers catch every exception."
    )]
    pub strict_error_codes: Option<bool>,

    #[arg(
        long,
        help = "Emit runtime checks that scattering assignments receive a list of acceptable length."
    )]
    pub scatter_arity_checks: Option<bool>,
}

impl CompileArgs {
    pub fn merge_config(&self, config: &mut CompileOptions) {
        if let Some(args) = self.strict_lexing {
            config.strict_lexing = args;
        }
        if let Some(args) = self.strict_error_codes {
            config.strict_error_codes = args;
        }
        if let Some(args) = self.scatter_arity_checks {
            config.scatter_arity_checks = args;
        }
    }
}
