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

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::path::Path;

    use similar_asserts::assert_eq;
    use transmoo_textdump::{ArgSpec, LambdaMOODBVersion, TextdumpReaderError, read_textdump};
    use transmoo_var::{Obj, SYSTEM_OBJECT, v_objid};

    const DUMP: &[u8] = b"** LambdaMOO Database, Format Version 1 **
2
1
0
0
#0
System Object

0
3
-1
-1
-1
-1
1
-1
2
do_login_command
3
173
-1
eval
3
88
7
1
default_home
1
1
62
3
5
#1 recycled
#0:1
return `player:tell(\"\xe9t\xe9\") ! ANY';
.
";

    fn write_dump(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn load_dump_from_file() {
        let file = write_dump(DUMP);
        let textdump = read_textdump(file.path()).unwrap();
        assert_eq!(textdump.version, LambdaMOODBVersion::DbvExceptions);
        assert!(textdump.users.is_empty());
        assert_eq!(textdump.objects.len(), 1);

        let sysobj = &textdump.objects[&SYSTEM_OBJECT];
        assert_eq!(sysobj.owner, Obj::mk_id(3));
        assert_eq!(sysobj.child, Obj::mk_id(1));
        assert_eq!(sysobj.propvals[0].value, v_objid(62));
        assert_eq!(sysobj.propvals[0].owner, Obj::mk_id(3));

        let eval = &sysobj.verbdefs[1];
        assert_eq!(eval.primary_name(), "eval");
        assert_eq!(eval.perms_string(), "d");
        let args = eval.args();
        assert_eq!(args.dobj, ArgSpec::Any);
        assert_eq!(args.iobj, ArgSpec::Any);
        assert_eq!(args.prep_name(), "through");
    }

    #[test]
    fn decode_latin1_program_text() {
        let file = write_dump(DUMP);
        let textdump = read_textdump(file.path()).unwrap();
        let verb = &textdump.verbs[&(SYSTEM_OBJECT, 1)];
        assert_eq!(
            verb.program,
            "return `player:tell(\"\u{e9}t\u{e9}\") ! ANY';"
        );
        assert_eq!(verb.start_line, 35);
        assert_eq!(
            textdump.verbdef(verb).map(|v| v.primary_name()),
            Some("eval")
        );
    }

    #[test]
    fn missing_file() {
        let result = read_textdump(Path::new("/nonexistent/transmoo/db.txt"));
        assert!(matches!(result, Err(TextdumpReaderError::CouldNotOpenFile(_))));
    }
}
