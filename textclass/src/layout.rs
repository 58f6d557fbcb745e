/*! Paragraph styles (`Style ... End` blocks) and the argument blocks shared with inset layouts. */

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use bitflags::bitflags;
use strum::{Display, EnumString};
use crate::fonts::FontInfo;
use crate::lexer::{keywords, Lexer, Tagged};
use crate::textclass::TextClass;
use crate::utils::{normalize_name, vector_from_string};

/// `toclevel` of styles that do not appear in the table of contents.
pub const NOT_IN_TOC: i32 = -1000;

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="snake_case")]
pub enum LatexType {
    #[default] Paragraph,
    Command,
    Environment,
    ItemEnvironment,
    BibEnvironment,
    ListEnvironment
}

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="snake_case")]
pub enum LabelType {
    #[default] NoLabel,
    Manual,
    Above,
    Centered,
    Static,
    Sensitive,
    Enumerate,
    Itemize,
    Bibliography
}

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="snake_case")]
pub enum EndLabelType { #[default] NoLabel, Box, FilledBox, Static }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="snake_case")]
pub enum MarginType { #[default] Static, Manual, FirstDynamic, Dynamic, RightAddressBox }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum Alignment { #[default] Block, Left, Right, Center, Layout, Decimal }

bitflags! {
    /// The alignments a user may choose for a paragraph of some style.
    #[derive(Copy,Clone,Debug,PartialEq,Eq,Hash)]
    pub struct AlignSet: u8 {
        const BLOCK = 1;
        const LEFT = 2;
        const RIGHT = 4;
        const CENTER = 8;
        const LAYOUT = 16;
        const DECIMAL = 32;
    }
}
impl From<Alignment> for AlignSet {
    fn from(a:Alignment) -> Self {
        match a {
            Alignment::Block => AlignSet::BLOCK,
            Alignment::Left => AlignSet::LEFT,
            Alignment::Right => AlignSet::RIGHT,
            Alignment::Center => AlignSet::CENTER,
            Alignment::Layout => AlignSet::LAYOUT,
            Alignment::Decimal => AlignSet::DECIMAL
        }
    }
}

#[derive(Copy,Clone,Debug,PartialEq,Default)]
pub enum Spacing { #[default] Default, Single, OneHalf, Double, Other(f64) }

/// An `Argument <id> ... EndArgument` block.
#[derive(Clone,Debug,PartialEq,Default)]
pub struct LatexArgument {
    pub labelstring:String,
    pub menustring:String,
    pub tooltip:String,
    pub mandatory:bool,
    pub autoinsert:bool,
    pub insertcotext:bool,
    pub leftdelim:String,
    pub rightdelim:String,
    pub presetarg:String,
    pub decoration:String,
    pub requires:String,
    pub pass_thru_chars:String,
    pub is_toc_caption:bool,
    pub font:FontInfo,
    pub labelfont:FontInfo
}

/// Reads the body of an `Argument` block following the argument id. Argument ids are `n`,
/// `post:n`, `item:n` or `listpreamble:n`.
pub fn read_argument(lex:&mut Lexer,args:&mut BTreeMap<String,LatexArgument>) -> bool {
    if !lex.next(false) {
        lex.print_error("Argument without id");
        return false
    }
    let id = lex.get_string().to_string();
    let mut arg = args.remove(&id).unwrap_or_default();
    let mut error = false;
    loop {
        if !lex.next(false) {
            lex.print_error("Missing EndArgument");
            error = true;
            break
        }
        let tok = lex.get_string().to_ascii_lowercase();
        match tok.as_str() {
            "endargument" => break,
            "labelstring" => { lex.next(false); arg.labelstring = lex.get_doc_string() }
            "menustring" => { lex.next(false); arg.menustring = lex.get_doc_string() }
            "tooltip" => { lex.next(false); arg.tooltip = lex.get_doc_string() }
            "mandatory" => { lex.next(false); arg.mandatory = lex.get_bool() }
            "autoinsert" => { lex.next(false); arg.autoinsert = lex.get_bool() }
            "insertcotext" => { lex.next(false); arg.insertcotext = lex.get_bool() }
            "istoccaption" => { lex.next(false); arg.is_toc_caption = lex.get_bool() }
            "leftdelim" => { lex.next(false); arg.leftdelim = lex.get_string().replace("<br/>","\n") }
            "rightdelim" => { lex.next(false); arg.rightdelim = lex.get_string().replace("<br/>","\n") }
            "presetarg" => { lex.next(false); arg.presetarg = lex.get_doc_string() }
            "decoration" => { lex.next(false); arg.decoration = lex.get_string().to_string() }
            "requires" => { lex.next(false); arg.requires = lex.get_string().to_string() }
            "passthruchars" => { lex.next(false); arg.pass_thru_chars = lex.get_doc_string() }
            "font" => {
                let (f,ok) = FontInfo::read(lex,arg.font.clone());
                arg.font = f;
                error |= !ok;
            }
            "labelfont" => {
                let (f,ok) = FontInfo::read(lex,arg.labelfont.clone());
                arg.labelfont = f;
                error |= !ok;
            }
            _ => {
                lex.print_error("Unknown tag `$$Token' in Argument");
                error = true;
            }
        }
    }
    if arg.labelstring.is_empty() {
        lex.print_error("Argument without LabelString");
    }
    args.insert(id,arg);
    !error
}

keywords! { enum LayoutTag in LAYOUT_TAGS {
    "align" => Align,
    "alignpossible" => AlignPossible,
    "argument" => Argument,
    "babelpreamble" => BabelPreamble,
    "bottomsep" => BottomSep,
    "category" => Category,
    "commanddepth" => CommandDepth,
    "copystyle" => CopyStyle,
    "end" => End,
    "endlabelstring" => EndLabelString,
    "endlabeltype" => EndLabelType,
    "font" => Font,
    "freespacing" => FreeSpacing,
    "htmlattr" => HtmlAttr,
    "htmlstyle" => HtmlStyle,
    "htmltag" => HtmlTag,
    "inpreamble" => InPreamble,
    "intitle" => InTitle,
    "itemsep" => ItemSep,
    "keepempty" => KeepEmpty,
    "labelbottomsep" => LabelBottomSep,
    "labelcounter" => LabelCounter,
    "labelfont" => LabelFont,
    "labelindent" => LabelIndent,
    "labelsep" => LabelSep,
    "labelstring" => LabelString,
    "labelstringappendix" => LabelStringAppendix,
    "labeltype" => LabelType,
    "langpreamble" => LangPreamble,
    "latexname" => LatexName,
    "latexparam" => LatexParam,
    "latextype" => LatexType,
    "leftmargin" => LeftMargin,
    "margin" => Margin,
    "needprotect" => NeedProtect,
    "newline" => Newline,
    "nextnoindent" => NextNoIndent,
    "obsoletedby" => ObsoletedBy,
    "parindent" => ParIndent,
    "parsep" => ParSep,
    "parskip" => ParSkip,
    "passthru" => PassThru,
    "preamble" => Preamble,
    "refprefix" => RefPrefix,
    "requires" => Requires,
    "resetargs" => ResetArgs,
    "rightmargin" => RightMargin,
    "spacing" => Spacing,
    "spellcheck" => Spellcheck,
    "textfont" => TextFont,
    "toclevel" => TocLevel,
    "topsep" => TopSep,
}}

/// One paragraph style of a text class.
#[derive(Clone,Debug,PartialEq)]
pub struct Layout {
    pub name:String,
    pub latextype:LatexType,
    pub latexname:String,
    pub latexparam:String,
    pub labeltype:LabelType,
    pub endlabeltype:EndLabelType,
    pub margintype:MarginType,
    pub align:Alignment,
    pub alignpossible:AlignSet,
    pub labelstring:String,
    pub labelstring_appendix:String,
    pub endlabelstring:String,
    /// The counter stepped by this style (`LabelCounter`).
    pub counter:String,
    pub category:String,
    pub font:FontInfo,
    pub labelfont:FontInfo,
    /// `font`, realised against the class's default font.
    pub resfont:FontInfo,
    /// `labelfont`, realised against the class's default font.
    pub reslabelfont:FontInfo,
    pub leftmargin:String,
    pub rightmargin:String,
    pub labelindent:String,
    pub labelsep:String,
    pub parindent:String,
    pub parskip:f64,
    pub itemsep:f64,
    pub topsep:f64,
    pub bottomsep:f64,
    pub labelbottomsep:f64,
    pub parsep:f64,
    pub spacing:Spacing,
    pub toclevel:i32,
    pub commanddepth:i32,
    pub obsoleted_by:String,
    pub preamble:String,
    pub langpreamble:String,
    pub babelpreamble:String,
    pub requires:BTreeSet<String>,
    pub latexargs:BTreeMap<String,LatexArgument>,
    pub refprefix:String,
    pub htmltag:String,
    pub htmlattr:String,
    pub htmlstyle:String,
    pub keepempty:bool,
    pub freespacing:bool,
    pub pass_thru:bool,
    pub needprotect:bool,
    pub newline_allowed:bool,
    pub nextnoindent:bool,
    pub intitle:bool,
    pub inpreamble:bool,
    pub spellcheck:bool
}

impl Layout {
    pub fn new(name:&str) -> Self {
        Layout {
            name:name.to_string(),
            latextype:LatexType::Paragraph, latexname:String::new(), latexparam:String::new(),
            labeltype:LabelType::NoLabel, endlabeltype:EndLabelType::NoLabel,
            margintype:MarginType::Static,
            align:Alignment::Block, alignpossible:AlignSet::BLOCK | AlignSet::LAYOUT,
            labelstring:String::new(), labelstring_appendix:String::new(),
            endlabelstring:String::new(), counter:String::new(), category:String::new(),
            font:FontInfo::default(), labelfont:FontInfo::default(),
            resfont:FontInfo::sane(), reslabelfont:FontInfo::sane(),
            leftmargin:String::new(), rightmargin:String::new(),
            labelindent:String::new(), labelsep:String::new(), parindent:String::new(),
            parskip:0.0, itemsep:0.0, topsep:0.0, bottomsep:0.0, labelbottomsep:0.0, parsep:0.0,
            spacing:Spacing::Default, toclevel:NOT_IN_TOC, commanddepth:0,
            obsoleted_by:String::new(), preamble:String::new(), langpreamble:String::new(),
            babelpreamble:String::new(), requires:BTreeSet::new(), latexargs:BTreeMap::new(),
            refprefix:String::new(), htmltag:String::new(), htmlattr:String::new(),
            htmlstyle:String::new(),
            keepempty:false, freespacing:false, pass_thru:false, needprotect:false,
            newline_allowed:true, nextnoindent:false, intitle:false, inpreamble:false,
            spellcheck:true
        }
    }

    pub fn is_environment(&self) -> bool {
        matches!(self.latextype,LatexType::Environment | LatexType::ItemEnvironment
            | LatexType::BibEnvironment | LatexType::ListEnvironment)
    }
    pub fn is_command(&self) -> bool { self.latextype == LatexType::Command }
    pub fn is_paragraph(&self) -> bool { self.latextype == LatexType::Paragraph }
    /// Whether paragraphs of this style show up in the table of contents.
    pub fn in_toc(&self) -> bool { self.toclevel != NOT_IN_TOC }

    /// Reads a style body up to its `End`. `tclass` resolves `CopyStyle` and `ObsoletedBy`.
    /// Returns `false` if any part of the block was rejected; the block is consumed anyway.
    pub fn read(&mut self,lex:&mut Lexer,tclass:&TextClass) -> bool {
        let mut error = false;
        let mut lex = lex.scoped_table(&LAYOUT_TAGS);
        loop {
            let tag = match lex.lex_tag::<LayoutTag>() {
                Tagged::Eof => {
                    lex.print_error(&format!("Style `{}' is not terminated by End",self.name));
                    return false
                }
                Tagged::Unknown => {
                    lex.print_error("Unknown layout tag `$$Token'");
                    error = true;
                    continue
                }
                Tagged::Tag(LayoutTag::End) => break,
                Tagged::Tag(t) => t
            };
            match tag {
                LayoutTag::CopyStyle | LayoutTag::ObsoletedBy => {
                    if !lex.next(false) { continue }
                    let style = normalize_name(lex.get_string());
                    match tclass.layout(&style) {
                        Some(other) => {
                            let name = std::mem::take(&mut self.name);
                            *self = other.clone();
                            self.name = name;
                            if tag == LayoutTag::ObsoletedBy { self.obsoleted_by = style }
                            else { self.obsoleted_by.clear() }
                        }
                        None => {
                            lex.print_error(&format!("Cannot copy unknown style `{}'!",style));
                        }
                    }
                }
                LayoutTag::Argument => error |= !read_argument(&mut lex,&mut self.latexargs),
                LayoutTag::ResetArgs => {
                    if lex.next(false) && lex.get_bool() { self.latexargs.clear() }
                }
                LayoutTag::Font => {
                    let (f,ok) = FontInfo::read(&mut lex,self.font.clone());
                    self.font = f;
                    self.labelfont = self.font.clone();
                    error |= !ok;
                }
                LayoutTag::TextFont => {
                    let (f,ok) = FontInfo::read(&mut lex,self.font.clone());
                    self.font = f;
                    error |= !ok;
                }
                LayoutTag::LabelFont => {
                    let (f,ok) = FontInfo::read(&mut lex,self.labelfont.clone());
                    self.labelfont = f;
                    error |= !ok;
                }
                LayoutTag::AlignPossible => {
                    self.alignpossible = AlignSet::LAYOUT;
                    while !lex.at_line_end() && lex.next(false) {
                        match Alignment::from_str(lex.get_string()) {
                            Ok(a) => self.alignpossible |= AlignSet::from(a),
                            Err(_) => lex.print_error("Unknown alignment `$$Token'")
                        }
                    }
                }
                LayoutTag::Preamble => self.preamble = lex.get_long_string("EndPreamble"),
                LayoutTag::LangPreamble => self.langpreamble = lex.get_long_string("EndLangPreamble"),
                LayoutTag::BabelPreamble => self.babelpreamble = lex.get_long_string("EndBabelPreamble"),
                LayoutTag::HtmlStyle => self.htmlstyle = lex.get_long_string("EndHTMLStyle"),
                LayoutTag::Requires => {
                    if lex.eat_line() {
                        self.requires.extend(vector_from_string(lex.get_string(),','))
                    }
                }
                LayoutTag::Spacing => self.read_spacing(&mut lex),
                t => {
                    if !lex.next(false) { continue }
                    error |= !self.set_value(t,&lex);
                }
            }
        }
        !error
    }

    /// Single-valued tags; the value is the current token of `lex`.
    fn set_value(&mut self,tag:LayoutTag,lex:&Lexer) -> bool {
        match tag {
            LayoutTag::Align => return lex.parse_into(&mut self.align,"alignment"),
            LayoutTag::LatexType => return lex.parse_into(&mut self.latextype,"latextype"),
            LayoutTag::LabelType => return lex.parse_into(&mut self.labeltype,"labeltype"),
            LayoutTag::EndLabelType => return lex.parse_into(&mut self.endlabeltype,"endlabeltype"),
            LayoutTag::Margin => return lex.parse_into(&mut self.margintype,"margin type"),
            LayoutTag::LatexName => self.latexname = lex.get_string().to_string(),
            LayoutTag::LatexParam => self.latexparam = lex.get_string().replace("&quot;","\""),
            LayoutTag::LabelString => self.labelstring = lex.get_doc_string(),
            LayoutTag::LabelStringAppendix => self.labelstring_appendix = lex.get_doc_string(),
            LayoutTag::EndLabelString => self.endlabelstring = lex.get_doc_string(),
            LayoutTag::LabelCounter => self.counter = lex.get_doc_string(),
            LayoutTag::Category => self.category = lex.get_doc_string(),
            LayoutTag::LeftMargin => self.leftmargin = lex.get_string().to_string(),
            LayoutTag::RightMargin => self.rightmargin = lex.get_string().to_string(),
            LayoutTag::LabelIndent => self.labelindent = lex.get_string().to_string(),
            LayoutTag::LabelSep => self.labelsep = lex.get_string().replace('x'," "),
            LayoutTag::ParIndent => self.parindent = lex.get_string().to_string(),
            LayoutTag::ParSkip => self.parskip = lex.get_float(),
            LayoutTag::ItemSep => self.itemsep = lex.get_float(),
            LayoutTag::TopSep => self.topsep = lex.get_float(),
            LayoutTag::BottomSep => self.bottomsep = lex.get_float(),
            LayoutTag::LabelBottomSep => self.labelbottomsep = lex.get_float(),
            LayoutTag::ParSep => self.parsep = lex.get_float(),
            LayoutTag::TocLevel => self.toclevel = lex.get_integer(),
            LayoutTag::CommandDepth => self.commanddepth = lex.get_integer(),
            LayoutTag::RefPrefix => self.refprefix = lex.get_doc_string(),
            LayoutTag::HtmlTag => self.htmltag = lex.get_string().to_string(),
            LayoutTag::HtmlAttr => self.htmlattr = lex.get_string().to_string(),
            LayoutTag::KeepEmpty => self.keepempty = lex.get_bool(),
            LayoutTag::FreeSpacing => self.freespacing = lex.get_bool(),
            LayoutTag::PassThru => self.pass_thru = lex.get_bool(),
            LayoutTag::NeedProtect => self.needprotect = lex.get_bool(),
            LayoutTag::Newline => self.newline_allowed = lex.get_bool(),
            LayoutTag::NextNoIndent => self.nextnoindent = lex.get_bool(),
            LayoutTag::InTitle => self.intitle = lex.get_bool(),
            LayoutTag::InPreamble => self.inpreamble = lex.get_bool(),
            LayoutTag::Spellcheck => self.spellcheck = lex.get_bool(),
            _ => ()
        }
        true
    }

    fn read_spacing(&mut self,lex:&mut Lexer) {
        if !lex.next(false) { return }
        self.spacing = match lex.get_string().to_ascii_lowercase().as_str() {
            "single" => Spacing::Single,
            "onehalf" => Spacing::OneHalf,
            "double" => Spacing::Double,
            "other" => {
                lex.next(false);
                Spacing::Other(lex.get_float())
            }
            _ => {
                lex.print_error("Unknown spacing token `$$Token'");
                Spacing::Default
            }
        }
    }
}
