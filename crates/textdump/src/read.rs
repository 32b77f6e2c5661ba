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

use std::{
    collections::BTreeMap,
    io::{BufRead, BufReader, ErrorKind, Read},
};

use encoding_rs::WINDOWS_1252;
use tracing::{debug, info};

use crate::{LambdaMOODBVersion, Object, Propval, Textdump, Verb, Verbdef};
use transmoo_var::{
    ErrorCode, Obj, Var, VarType, v_err, v_float, v_int, v_list, v_none, v_obj, v_string,
};

pub struct TextdumpReader<R: Read> {
    pub line_num: usize,
    pub version: LambdaMOODBVersion,
    pub version_string: String,
    pub reader: BufReader<R>,
}

#[derive(Debug, thiserror::Error)]
pub enum TextdumpReaderError {
    #[error("could not open file: {0}")]
    CouldNotOpenFile(String),
    #[error("io error: {0} @ line {1}")]
    IoError(std::io::Error, usize),
    #[error("parse error: {0} @ line {1}")]
    ParseError(String, usize),
    #[error("textdump version error: {0}")]
    VersionError(String),
}

impl<R: Read> TextdumpReader<R> {
    pub fn new(reader: BufReader<R>) -> Result<Self, TextdumpReaderError> {
        let mut reader = Self {
            line_num: 1,
            version: LambdaMOODBVersion::DbvPrehistory,
            version_string: String::new(),
            reader,
        };
        // The first line carries the format version.
        let version_string = reader.read_string().map_err(|e| {
            TextdumpReaderError::VersionError(format!("could not read textdump version: {e}"))
        })?;
        info!("version {}", version_string);

        reader.version = LambdaMOODBVersion::parse(&version_string).ok_or_else(|| {
            TextdumpReaderError::VersionError(format!("unsupported version: {version_string}"))
        })?;
        reader.version_string = version_string;
        Ok(reader)
    }

    /// LambdaMOO writes bytes, not text. Anything outside ASCII is read as Windows-1252.
    fn read_next_line(&mut self) -> Result<String, TextdumpReaderError> {
        let mut buf = vec![];
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                return Err(TextdumpReaderError::IoError(
                    ErrorKind::UnexpectedEof.into(),
                    self.line_num,
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(TextdumpReaderError::IoError(e, self.line_num)),
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        self.line_num += 1;
        let (line, _) = WINDOWS_1252.decode_without_bom_handling(&buf);
        Ok(line.into_owned())
    }

    fn read_num(&mut self) -> Result<i64, TextdumpReaderError> {
        let buf = self.read_next_line()?;
        let Ok(i) = buf.trim().parse() else {
            return Err(TextdumpReaderError::ParseError(
                format!("invalid number: {buf}"),
                self.line_num,
            ));
        };
        Ok(i)
    }

    fn read_objid(&mut self) -> Result<Obj, TextdumpReaderError> {
        let buf = self.read_next_line()?;
        let trimmed = buf.trim();
        let Ok(u) = trimmed.parse() else {
            return Err(TextdumpReaderError::ParseError(
                format!("invalid objid: {trimmed}"),
                self.line_num,
            ));
        };
        Ok(Obj::mk_id(u))
    }

    fn read_float(&mut self) -> Result<f64, TextdumpReaderError> {
        let buf = self.read_next_line()?;
        let Ok(f) = buf.trim().parse() else {
            return Err(TextdumpReaderError::ParseError(
                format!("invalid float: {buf}"),
                self.line_num,
            ));
        };
        Ok(f)
    }

    fn read_string(&mut self) -> Result<String, TextdumpReaderError> {
        self.read_next_line()
    }

    fn read_count(&mut self) -> Result<usize, TextdumpReaderError> {
        let n = self.read_num()?;
        usize::try_from(n).map_err(|_| {
            TextdumpReaderError::ParseError(format!("invalid count: {n}"), self.line_num)
        })
    }

    fn read_verbdef(&mut self) -> Result<Verbdef, TextdumpReaderError> {
        let name = self.read_string()?;
        let owner = self.read_objid()?;
        let perms = self.read_num()? as u16;
        let prep = self.read_num()? as i16;
        Ok(Verbdef {
            name,
            owner,
            flags: perms,
            prep,
        })
    }

    fn read_var_value(&mut self, t_num: i64) -> Result<Var, TextdumpReaderError> {
        let Some(vtype) = u8::try_from(t_num).ok().and_then(VarType::from_repr) else {
            return Err(TextdumpReaderError::ParseError(
                format!("invalid var type: {t_num}"),
                self.line_num,
            ));
        };
        let v = match vtype {
            VarType::TYPE_INT => v_int(self.read_num()?),
            VarType::TYPE_OBJ => v_obj(self.read_objid()?),
            VarType::TYPE_STR => v_string(self.read_string()?),
            VarType::TYPE_ERR => {
                let e_num = self.read_num()?;
                let Some(code) = u8::try_from(e_num).ok().and_then(ErrorCode::from_repr) else {
                    return Err(TextdumpReaderError::ParseError(
                        format!("invalid error code: {e_num}"),
                        self.line_num,
                    ));
                };
                v_err(code)
            }
            VarType::TYPE_LIST => {
                let l_size = self.read_count()?;
                let mut v = Vec::with_capacity(l_size);
                for _ in 0..l_size {
                    v.push(self.read_var()?);
                }
                v_list(&v)
            }
            VarType::TYPE_FLOAT => v_float(self.read_float()?),
            // Loop and handler markers only ever appear on suspended task stacks.
            VarType::TYPE_CATCH | VarType::TYPE_FINALLY => v_int(self.read_num()?),
            VarType::TYPE_CLEAR | VarType::TYPE_NONE => v_none(),
        };
        Ok(v)
    }

    fn read_var(&mut self) -> Result<Var, TextdumpReaderError> {
        let t_num = self.read_num()?;
        self.read_var_value(t_num)
    }

    fn read_propval(&mut self) -> Result<Propval, TextdumpReaderError> {
        let t_num = self.read_num()?;
        // A clear value inherits from the parent, and carries no value line of its own.
        let is_clear = t_num == VarType::TYPE_CLEAR as i64;
        let value = self.read_var_value(t_num)?;
        Ok(Propval {
            value,
            owner: self.read_objid()?,
            flags: self.read_num()? as u8,
            is_clear,
        })
    }

    fn read_object(&mut self) -> Result<Option<Object>, TextdumpReaderError> {
        let ospec = self.read_string()?;
        let ospec = ospec.trim();

        let ospec = match ospec.split_once(' ') {
            None => ospec,
            Some((_, flag)) if flag.trim() == "recycled" => {
                debug!("skipping recycled object {ospec}");
                return Ok(None);
            }
            Some((oid, _)) => oid,
        };

        let Some(oid_str) = ospec.strip_prefix('#') else {
            return Err(TextdumpReaderError::ParseError(
                format!("invalid object spec: {ospec}"),
                self.line_num,
            ));
        };
        let Ok(oid) = oid_str.trim().parse() else {
            return Err(TextdumpReaderError::ParseError(
                format!("invalid objid: {oid_str}"),
                self.line_num,
            ));
        };
        let name = self.read_string()?;
        let _ohandles_string = self.read_string()?;
        let flags = self.read_num()? as u8;
        let owner = self.read_objid()?;
        let location = self.read_objid()?;
        let contents = self.read_objid()?;
        let next = self.read_objid()?;
        let parent = self.read_objid()?;
        let child = self.read_objid()?;
        let sibling = self.read_objid()?;

        let num_verbs = self.read_count()?;
        let mut verbdefs = Vec::with_capacity(num_verbs);
        for _ in 0..num_verbs {
            verbdefs.push(self.read_verbdef()?);
        }
        let num_pdefs = self.read_count()?;
        let mut propdefs = Vec::with_capacity(num_pdefs);
        for _ in 0..num_pdefs {
            propdefs.push(self.read_string()?);
        }
        let num_pvals = self.read_count()?;
        let mut propvals = Vec::with_capacity(num_pvals);
        for _ in 0..num_pvals {
            propvals.push(self.read_propval()?);
        }

        Ok(Some(Object {
            id: Obj::mk_id(oid),
            owner,
            location,
            contents,
            next,
            parent,
            child,
            sibling,
            name,
            flags,
            verbdefs,
            propdefs,
            propvals,
        }))
    }

    fn read_program(&mut self) -> Result<Vec<String>, TextdumpReaderError> {
        let mut program = vec![];
        loop {
            let line = self.read_string()?;
            if line.trim() == "." {
                break;
            }
            program.push(line);
        }
        Ok(program)
    }

    fn read_verb(&mut self) -> Result<Verb, TextdumpReaderError> {
        let header = self.read_string()?;

        let (oid, verbnum) = match header.strip_prefix('#').and_then(|s| s.split_once(':')) {
            Some((oid_str, verbnum_str)) => {
                let oid = oid_str.trim().parse::<i32>().map_err(|e| {
                    TextdumpReaderError::ParseError(
                        format!("invalid object id: {e}"),
                        self.line_num,
                    )
                })?;
                let verbnum = verbnum_str.trim().parse::<usize>().map_err(|e| {
                    TextdumpReaderError::ParseError(
                        format!("invalid verb number: {e}"),
                        self.line_num,
                    )
                })?;
                (oid, verbnum)
            }
            None => {
                return Err(TextdumpReaderError::ParseError(
                    format!("invalid verb header format: {header}"),
                    self.line_num,
                ));
            }
        };

        let start_line = self.line_num;
        let program = self.read_program()?.join("\n");
        Ok(Verb {
            objid: Obj::mk_id(oid),
            verbnum,
            program,
            start_line,
        })
    }

    /// Read the database up to the end of the verb programs. The task queue and connection
    /// records that follow are not needed to recover source.
    pub fn read_textdump(&mut self) -> Result<Textdump, TextdumpReaderError> {
        let (nobjs, nprogs, _, nusers) = (
            self.read_count()?,
            self.read_count()?,
            self.read_num()?,
            self.read_count()?,
        );
        info!("# users: {}", nusers);
        let mut users = Vec::with_capacity(nusers);
        for _ in 0..nusers {
            users.push(self.read_objid()?);
        }

        info!("# objs: {}", nobjs);
        info!("# progs: {}", nprogs);

        info!("Parsing objects...");
        let mut objects = BTreeMap::new();
        for _i in 0..nobjs {
            if let Some(o) = self.read_object()? {
                objects.insert(o.id, o);
            }
        }

        info!("Reading verbs...");
        let mut verbs = BTreeMap::new();
        for _p in 0..nprogs {
            let verb = self.read_verb()?;
            verbs.insert((verb.objid, verb.verbnum), verb);
        }

        Ok(Textdump {
            version: self.version,
            version_string: self.version_string.clone(),
            objects,
            users,
            verbs,
        })
    }
}
