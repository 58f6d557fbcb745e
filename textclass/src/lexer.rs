/*! A small streaming tokenizer for the keyword/value format shared by `.layout`, `.module`,
`.citeengine` and `*.lst` files.

Tokens are separated by whitespace (or `,`); `#` starts a comment running to the end of the
line; `"..."` is a single [`LexCode::Data`] token. Which bare words count as keywords is
decided by the [`KeywordTable`] on top of the lexer's table stack, so nested blocks
(e.g. `Float ... End`) can recognize their own vocabulary and restore the outer one when
done, see [`Lexer::scoped_table`].

**Example:**
```rust
use textclass::lexer::{Lexer,LexCode};
let mut lex = Lexer::from_str("<example>","Columns 2 # comment\n\"quoted value\"");
assert_eq!(lex.lex(),LexCode::Token);
assert_eq!(lex.get_string(),"Columns");
assert!(lex.next(false));
assert_eq!(lex.get_integer(),2);
assert_eq!(lex.lex(),LexCode::Data);
assert_eq!(lex.get_string(),"quoted value");
assert_eq!(lex.lex(),LexCode::Feof);
```
*/

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use log::{error, trace};
use crate::utils::HMap;
use crate::utils::errors::LayoutError;

/// What [`Lexer::lex`] found.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum LexCode {
    /// End of input.
    Feof,
    /// A bare word that is not in the active keyword table.
    Undef,
    /// A quoted string, or the result of [`Lexer::eat_line`].
    Data,
    /// A bare word read while no keyword table is active.
    Token,
    /// A keyword; the code is its index in the active [`KeywordTable`].
    Keyword(u16)
}

/// Case-insensitive map from keyword spellings to their codes.
pub struct KeywordTable {
    name:&'static str,
    map:HMap<String,u16>
}
impl KeywordTable {
    /// Builds a table where the `i`-th tag gets code `i`.
    pub fn new(name:&'static str,tags:&[&'static str]) -> Self {
        let map = tags.iter().enumerate()
            .map(|(i,t)| (t.to_ascii_lowercase(),i as u16))
            .collect();
        KeywordTable { name, map }
    }
    pub fn name(&self) -> &'static str { self.name }
    pub fn search(&self,token:&str) -> Option<u16> {
        self.map.get(&token.to_ascii_lowercase()).copied()
    }
    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}

/// An enum whose variants are the keywords of one [`KeywordTable`]; usually generated by
/// the `keywords!` macro.
pub trait Keyword: Copy + Sized + 'static {
    fn table() -> &'static KeywordTable;
    fn from_code(code:u16) -> Option<Self>;
}

/// Result of [`Lexer::lex_tag`].
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum Tagged<K> {
    Eof,
    /// Anything that is not a keyword of `K`; the raw text is in [`Lexer::get_string`].
    Unknown,
    Tag(K)
}

/// Declares a keyword enum together with its (lazily built) [`KeywordTable`].
/// Spellings are matched case-insensitively.
macro_rules! keywords {
    ($(#[$meta:meta])* $vis:vis enum $name:ident in $table:ident { $($tag:literal => $variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Copy,Clone,Debug,PartialEq,Eq)]
        $vis enum $name { $($variant),* }
        lazy_static::lazy_static! {
            static ref $table : $crate::lexer::KeywordTable =
                $crate::lexer::KeywordTable::new(stringify!($name),&[$($tag),*]);
        }
        impl $crate::lexer::Keyword for $name {
            fn table() -> &'static $crate::lexer::KeywordTable { &$table }
            fn from_code(code:u16) -> Option<Self> {
                const ALL:&[$name] = &[$($name::$variant),*];
                ALL.get(code as usize).copied()
            }
        }
    }
}
pub(crate) use keywords;

/// The tokenizer. One instance reads one file or string and is discarded afterwards.
pub struct Lexer {
    name:String,
    path:Option<PathBuf>,
    lines:Vec<String>,
    line:usize,
    col:usize,
    token_line:usize,
    tables:Vec<&'static KeywordTable>,
    pushed:Option<String>,
    token:String,
    status:LexCode,
    eof:bool,
    failed:bool,
    bound:bool
}

impl Default for Lexer {
    fn default() -> Self { Self::new() }
}

impl Lexer {
    /// A lexer without input and without keyword table.
    pub fn new() -> Self {
        Lexer {
            name:String::new(), path:None, lines:Vec::new(),
            line:0, col:0, token_line:0,
            tables:Vec::new(), pushed:None,
            token:String::new(), status:LexCode::Feof,
            eof:false, failed:false, bound:false
        }
    }
    /// A lexer whose base keyword table is `table`.
    pub fn with_table(table:&'static KeywordTable) -> Self {
        let mut ret = Self::new();
        ret.tables.push(table);
        ret
    }
    /// A lexer over the string `text`; `name` is only used in error messages.
    pub fn from_str(name:&str,text:&str) -> Self {
        let mut ret = Self::new();
        ret.set_string(name,text);
        ret
    }

    /// Binds the lexer to the contents of `path` and resets the line counter.
    pub fn set_file<P:AsRef<Path>>(&mut self,path:P) -> Result<(),LayoutError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LayoutError::io(path,e))?;
        let text = String::from_utf8_lossy(&bytes);
        self.set_string(&path.display().to_string(),&text);
        self.path = Some(path.to_path_buf());
        Ok(())
    }
    /// Binds the lexer to `text` and resets the line counter.
    pub fn set_string(&mut self,name:&str,text:&str) {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        self.lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l).to_string()).collect();
        self.name = name.to_string();
        self.path = None;
        self.line = 0;
        self.col = 0;
        self.token_line = 0;
        self.pushed = None;
        self.token.clear();
        self.status = LexCode::Feof;
        self.eof = false;
        self.failed = false;
        self.bound = true;
    }

    /// The name of the input, for messages.
    pub fn file_name(&self) -> &str { &self.name }
    /// The file the lexer reads from, if any.
    pub fn file_path(&self) -> Option<&Path> { self.path.as_deref() }
    /// The (1-based) line of the most recently read token.
    pub fn line_number(&self) -> usize { self.token_line + 1 }
    /// `false` once the input is exhausted or a required literal was not found.
    pub fn is_ok(&self) -> bool { self.bound && !self.eof && !self.failed }
    /// The code of the last [`lex`](Self::lex)/[`next`](Self::next) call.
    pub fn status(&self) -> LexCode { self.status }

    // ---- keyword tables ------------------------------------------------------------------

    pub fn push_table(&mut self,table:&'static KeywordTable) {
        trace!(target:"parser","push table {}",table.name());
        self.tables.push(table);
    }
    pub fn pop_table(&mut self) {
        match self.tables.pop() {
            Some(t) => trace!(target:"parser","pop table {}",t.name()),
            None => error!(target:"parser","{}: popping an empty keyword table stack",self.name)
        }
    }
    /// Pushes `table` for as long as the returned guard lives; the table is popped again
    /// on every exit path of the enclosing function.
    #[must_use]
    pub fn scoped_table(&mut self,table:&'static KeywordTable) -> TableGuard<'_> {
        self.push_table(table);
        TableGuard { lexer:self }
    }

    // ---- reading -------------------------------------------------------------------------

    fn is_separator(c:char) -> bool { c == ' ' || c == '\t' || c == ',' }

    /// Moves to the start of the next token, skipping blanks, separators and comments.
    fn skip_blank(&mut self) -> bool {
        loop {
            let Some(line) = self.lines.get(self.line) else { return false };
            let rest = &line[self.col..];
            let trimmed = rest.trim_start_matches(Self::is_separator);
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.line += 1;
                self.col = 0;
                continue
            }
            self.col += rest.len() - trimmed.len();
            return true
        }
    }

    /// Reads one raw token; the flag says whether it was quoted.
    fn read_raw(&mut self,escapes:bool) -> Option<(String,bool)> {
        if let Some(tk) = self.pushed.take() {
            return Some((tk,false))
        }
        if !self.skip_blank() {
            self.eof = true;
            return None
        }
        self.token_line = self.line;
        let line = &self.lines[self.line];
        let rest = &line[self.col..];
        if let Some(quoted) = rest.strip_prefix('"') {
            let mut ret = String::new();
            let mut chars = quoted.char_indices();
            let mut end = None;
            while let Some((i,c)) = chars.next() {
                match c {
                    '\\' if escapes => {
                        if let Some((_,n)) = chars.next() { ret.push(n) }
                    }
                    '"' => { end = Some(i); break }
                    c => ret.push(c)
                }
            }
            match end {
                Some(i) => self.col += i + 2,
                None => {
                    self.col = line.len();
                    self.token = ret.clone();
                    self.print_error("Missing quote in `$$Token'");
                }
            }
            Some((ret,true))
        } else {
            let len = rest.find(|c:char| c.is_whitespace() || c == ',').unwrap_or(rest.len());
            let ret = rest[..len].to_string();
            self.col += len;
            Some((ret,false))
        }
    }

    /// Advances by one token and classifies it against the active keyword table.
    pub fn lex(&mut self) -> LexCode {
        self.status = match self.read_raw(false) {
            None => { self.token.clear(); LexCode::Feof }
            Some((tk,true)) => { self.token = tk; LexCode::Data }
            Some((tk,false)) => {
                let code = match self.tables.last() {
                    None => LexCode::Token,
                    Some(table) => match table.search(&tk) {
                        Some(c) => LexCode::Keyword(c),
                        None => {
                            trace!(target:"parser","`{}' is not a keyword of {}",tk,table.name());
                            LexCode::Undef
                        }
                    }
                };
                self.token = tk;
                code
            }
        };
        self.status
    }

    /// [`lex`](Self::lex), converting keyword codes to `K`; `K`'s table must be the active one.
    pub fn lex_tag<K:Keyword>(&mut self) -> Tagged<K> {
        debug_assert!(self.tables.last().is_some_and(|t| std::ptr::eq(*t,K::table())),
            "lex_tag called while {:?} is not the active table",K::table().name());
        match self.lex() {
            LexCode::Feof => Tagged::Eof,
            LexCode::Keyword(c) => K::from_code(c).map_or(Tagged::Unknown,Tagged::Tag),
            _ => Tagged::Unknown
        }
    }

    /// Reads the next token as a plain value, ignoring keyword tables. With `escapes`,
    /// `\"` and `\\` inside quoted strings are honoured.
    pub fn next(&mut self,escapes:bool) -> bool {
        match self.read_raw(escapes) {
            None => {
                self.token.clear();
                self.status = LexCode::Feof;
                false
            }
            Some((tk,quoted)) => {
                self.token = tk;
                self.status = if quoted { LexCode::Data } else { LexCode::Token };
                true
            }
        }
    }

    /// Reads the raw rest of the current line (possibly empty) as one token.
    pub fn eat_line(&mut self) -> bool {
        self.pushed = None;
        match self.lines.get(self.line) {
            None => {
                self.eof = true;
                self.token.clear();
                self.status = LexCode::Feof;
                false
            }
            Some(line) => {
                self.token = line[self.col.min(line.len())..].to_string();
                self.token_line = self.line;
                self.line += 1;
                self.col = 0;
                self.status = LexCode::Data;
                true
            }
        }
    }

    /// Whether nothing but blanks or a comment remains on the current line.
    pub fn at_line_end(&self) -> bool {
        if self.pushed.is_some() { return false }
        match self.lines.get(self.line) {
            None => true,
            Some(line) => {
                let rest = line[self.col.min(line.len())..].trim_start_matches(Self::is_separator);
                rest.is_empty() || rest.starts_with('#')
            }
        }
    }

    /// Makes `token` the next one returned by [`lex`](Self::lex)/[`next`](Self::next).
    pub fn push_token(&mut self,token:&str) {
        self.pushed = Some(token.to_string());
    }

    /// Reads the next token; if it is not `required`, pushes it back and returns `false`.
    pub fn check_for(&mut self,required:&str) -> bool {
        if !self.next(false) { return false }
        if self.token == required { return true }
        let tk = std::mem::take(&mut self.token);
        self.push_token(&tk);
        false
    }

    /// Requires the next token to be exactly `required`; otherwise the lexer is marked as
    /// failed and [`is_ok`](Self::is_ok) returns `false` from now on.
    pub fn expect(&mut self,required:&str) -> bool {
        if self.next(false) && self.token == required { return true }
        self.failed = true;
        self.print_error(&format!("Expected `{}' but found `$$Token'",required));
        false
    }

    /// Reads raw lines until one consisting only of `endtag` (compared case-insensitively).
    /// The whitespace prefix of the first non-blank line is removed from every line that
    /// starts with it, and leading tabs are dropped.
    pub fn get_long_string(&mut self,endtag:&str) -> String {
        self.pushed = None;
        if let Some(line) = self.lines.get(self.line) {
            if line[self.col.min(line.len())..].trim().is_empty() {
                self.line += 1;
                self.col = 0;
            }
        }
        let mut ret = String::new();
        let mut prefix : Option<String> = None;
        let mut ended = false;
        while self.eat_line() {
            let raw = std::mem::take(&mut self.token);
            trace!(target:"parser","LongString: `{}'",raw);
            if raw.trim().eq_ignore_ascii_case(endtag) {
                ended = true;
                break
            }
            if prefix.is_none() && !raw.trim().is_empty() {
                let p = &raw[..raw.len() - raw.trim_start_matches([' ','\t']).len()];
                trace!(target:"parser","Prefix = `{}'",p);
                prefix = Some(p.to_string());
            }
            let line = match &prefix {
                Some(p) if !p.is_empty() && raw.starts_with(p.as_str()) => &raw[p.len()..],
                _ => raw.as_str()
            };
            ret.push_str(line.trim_start_matches('\t'));
            ret.push('\n');
        }
        if !ended {
            self.print_error(&format!("Long string not ended by `{}'",endtag));
        }
        ret
    }

    // ---- typed access --------------------------------------------------------------------

    /// The text of the most recently read token.
    pub fn get_string(&self) -> &str { &self.token }
    /// The most recently read token with surrounding whitespace removed, for free text.
    pub fn get_doc_string(&self) -> String { self.token.trim().to_string() }
    /// The last token as an integer; reports an error and returns `-1` if it is none.
    pub fn get_integer(&self) -> i32 {
        match self.token.trim().parse::<i32>() {
            Ok(i) => i,
            Err(_) => {
                self.print_error("Bad integer `$$Token'");
                -1
            }
        }
    }
    /// The last token as a float; `,` is accepted as decimal separator.
    pub fn get_float(&self) -> f64 {
        match self.token.trim().replace(',',".").parse::<f64>() {
            Ok(f) => f,
            Err(_) => {
                self.print_error("Bad float `$$Token'");
                -1.0
            }
        }
    }
    /// The last token as a boolean (`true`/`1` or `false`/`0`).
    pub fn get_bool(&self) -> bool {
        let t = self.token.trim();
        if t.eq_ignore_ascii_case("true") || t == "1" { return true }
        if !(t.eq_ignore_ascii_case("false") || t == "0") {
            self.print_error("Bad boolean `$$Token'. Use \"false\" or \"true\"");
        }
        false
    }

    /// Parses the last token into `field`; reports `Unknown <what>` and leaves `field` alone
    /// if that fails.
    pub fn parse_into<T:std::str::FromStr>(&self,field:&mut T,what:&str) -> bool {
        match self.token.trim().parse::<T>() {
            Ok(v) => { *field = v; true }
            Err(_) => {
                self.print_error(&format!("Unknown {} `$$Token'",what));
                false
            }
        }
    }

    /// Reports `msg` with the position of the current token; `$$Token` in `msg` is replaced
    /// by the token's text. Never fails.
    pub fn print_error(&self,msg:&str) {
        error!(target:"parser","{}",self.error_message(msg));
    }
    /// The text [`print_error`](Self::print_error) logs for `msg`.
    pub fn error_message(&self,msg:&str) -> String {
        format!("{} [around line {} of file {}, current token: '{}']",
            msg.replace("$$Token",&self.token),self.line_number(),self.name,self.token)
    }
}

/// Keeps a keyword table pushed on a [`Lexer`] until dropped; see [`Lexer::scoped_table`].
pub struct TableGuard<'l> {
    lexer:&'l mut Lexer
}
impl Drop for TableGuard<'_> {
    fn drop(&mut self) { self.lexer.pop_table() }
}
impl Deref for TableGuard<'_> {
    type Target = Lexer;
    fn deref(&self) -> &Lexer { self.lexer }
}
impl DerefMut for TableGuard<'_> {
    fn deref_mut(&mut self) -> &mut Lexer { self.lexer }
}
