/*! Citation styles as declared in `CiteEngine ... End` blocks, and the engine types they are
    filed under.
*/

use bitflags::bitflags;
use crate::lexer::Lexer;
use crate::utils::{split_once_or_all, vector_from_string};

bitflags! {
    /// The kinds of citation an engine supports. `DEFAULT` is the union of both, so data
    /// declared for `DEFAULT` is filed under each of them.
    #[derive(Copy,Clone,Debug,PartialEq,Eq,PartialOrd,Ord,Hash)]
    pub struct CiteEngineType: u8 {
        const AUTHORYEAR = 1;
        const NUMERICAL = 2;
        const DEFAULT = Self::AUTHORYEAR.bits() | Self::NUMERICAL.bits();
    }
}

impl CiteEngineType {
    /// The single-type buckets cite data is stored under, in lookup order.
    pub const BUCKETS: [CiteEngineType;2] = [CiteEngineType::AUTHORYEAR,CiteEngineType::NUMERICAL];

    /// `authoryear`, `numerical` or `default`, case-insensitively.
    pub fn parse_name(s:&str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("authoryear") { Some(CiteEngineType::AUTHORYEAR) }
        else if s.eq_ignore_ascii_case("numerical") { Some(CiteEngineType::NUMERICAL) }
        else if s.eq_ignore_ascii_case("default") { Some(CiteEngineType::DEFAULT) }
        else { None }
    }
    pub fn name(self) -> &'static str {
        if self == CiteEngineType::AUTHORYEAR { "authoryear" }
        else if self == CiteEngineType::NUMERICAL { "numerical" }
        else { "default" }
    }
    /// The buckets contained in `self`.
    pub fn buckets(self) -> impl Iterator<Item=CiteEngineType> {
        Self::BUCKETS.into_iter().filter(move |b| self.contains(*b))
    }

    /// Reads the engine type following `CiteEngine`, `CiteFormat` or `CiteEngineType`.
    /// Anything unknown is reported and treated as `default`.
    pub fn read(lex:&mut Lexer) -> CiteEngineType {
        if !lex.next(false) {
            lex.print_error("No cite engine type given for token: `$$Token'.");
            return CiteEngineType::DEFAULT
        }
        match CiteEngineType::parse_name(lex.get_string()) {
            Some(t) => t,
            None => {
                lex.print_error(&format!("Unknown cite engine type `{}' given for token: `$$Token',",
                    lex.get_string()));
                CiteEngineType::DEFAULT
            }
        }
    }
}

/// One citation command of an engine, e.g. `Citet*[][]` or `citep|citealt=citep`.
#[derive(Clone,Debug,PartialEq,Eq,Default)]
pub struct CitationStyle {
    /// The name LyX documents use.
    pub name:String,
    /// The LaTeX command written out; the name unless overridden by `=cmd`.
    pub cmd:String,
    pub stardesc:String,
    pub startooltip:String,
    /// Leading uppercase letter: the first author is capitalised.
    pub force_upper_case:bool,
    /// `*`: there is a variant with the full author list.
    pub has_starred_version:bool,
    /// `$`: the command takes a list of keys with individual pre-/post-texts.
    pub has_qualified_list:bool,
    pub text_after:bool,
    pub text_before:bool
}

impl CitationStyle {
    /** Parses one line of a `CiteEngine` block (blanks already removed):
`LyXName|alias,alias*<stardesc!tooltip>[][]=latexcmd`. Returns the style and its aliases.

The first `[` means "has text after"; any later `[` means "has text before".
    */
    pub fn parse(def:&str) -> (CitationStyle,Vec<String>) {
        #[derive(Copy,Clone,PartialEq)]
        enum Mode { Name, Alias, LatexCmd, StarDesc }
        let mut cs = CitationStyle::default();
        let mut mode = Mode::Name;
        let mut oldmode = Mode::Name;
        let (mut name,mut alias,mut cmd,mut stardesc) = (String::new(),String::new(),String::new(),String::new());
        let mut chars = def.chars();
        if let Some(c) = chars.next() {
            if c.is_uppercase() {
                cs.force_upper_case = true;
                name.extend(c.to_lowercase());
            } else {
                chars = def.chars();
            }
        }
        for c in chars {
            match c {
                '|' => mode = Mode::Alias,
                '=' => mode = Mode::LatexCmd,
                '<' => { oldmode = mode; mode = Mode::StarDesc }
                '>' => mode = oldmode,
                '*' => cs.has_starred_version = true,
                '[' if cs.text_after => cs.text_before = true,
                '[' => cs.text_after = true,
                '$' => cs.has_qualified_list = true,
                ']' => (),
                c => match mode {
                    Mode::Alias => alias.push(c),
                    Mode::LatexCmd => cmd.push(c),
                    Mode::StarDesc => stardesc.push(c),
                    Mode::Name => name.push(c)
                }
            }
        }
        cs.cmd = if cmd.is_empty() { name.clone() } else { cmd };
        cs.name = name;
        let (desc,tooltip) = split_once_or_all(&stardesc,'!');
        cs.stardesc = desc.to_string();
        cs.startooltip = tooltip.to_string();
        (cs,vector_from_string(&alias,','))
    }
}
