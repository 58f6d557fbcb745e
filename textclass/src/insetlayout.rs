/*! Layouts of insets (`InsetLayout ... End` blocks): notes, flex insets, captions etc. */

use std::collections::{BTreeMap, BTreeSet};
use lazy_static::lazy_static;
use strum::{Display, EnumString};
use crate::fonts::FontInfo;
use crate::layout::{read_argument, LatexArgument};
use crate::lexer::{keywords, Lexer, Tagged};
use crate::textclass::TextClass;
use crate::utils::{normalize_name, vector_from_string};

/// Inset layouts by name, in name order.
pub type InsetLayouts = BTreeMap<String,InsetLayout>;

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum InsetLyXType { #[default] Standard, CharStyle, Custom, Element, End }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum InsetLatexType { #[default] #[strum(serialize="none")] NoLatexType, Command, Environment, Paragraph }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum InsetDecoration { #[default] Default, Classic, Minimalistic, Conglomerate }

keywords! { enum InsetTag in INSET_TAGS {
    "argument" => Argument,
    "bgcolor" => BgColor,
    "contentaslabel" => ContentAsLabel,
    "copystyle" => CopyStyle,
    "custompars" => CustomPars,
    "decoration" => Decoration,
    "display" => Display,
    "end" => End,
    "font" => Font,
    "forceplain" => ForcePlain,
    "freespacing" => FreeSpacing,
    "htmlattr" => HtmlAttr,
    "htmlstyle" => HtmlStyle,
    "htmltag" => HtmlTag,
    "intoc" => InToc,
    "istoccaption" => IsTocCaption,
    "keepempty" => KeepEmpty,
    "labelfont" => LabelFont,
    "labelstring" => LabelString,
    "latexname" => LatexName,
    "latexparam" => LatexParam,
    "latextype" => LatexType,
    "lyxtype" => LyxType,
    "multipar" => MultiPar,
    "needprotect" => NeedProtect,
    "obsoletedby" => ObsoletedBy,
    "parbreakisnewline" => ParbreakIsNewline,
    "passthru" => PassThru,
    "preamble" => Preamble,
    "refprefix" => RefPrefix,
    "requires" => Requires,
    "resetsfont" => ResetsFont,
    "spellcheck" => Spellcheck,
}}

#[derive(Clone,Debug,PartialEq)]
pub struct InsetLayout {
    pub name:String,
    pub lyxtype:InsetLyXType,
    pub latextype:InsetLatexType,
    pub decoration:InsetDecoration,
    pub labelstring:String,
    pub latexname:String,
    pub latexparam:String,
    pub font:FontInfo,
    pub labelfont:FontInfo,
    pub bgcolor:String,
    pub preamble:String,
    pub refprefix:String,
    pub htmltag:String,
    pub htmlattr:String,
    pub htmlstyle:String,
    pub obsoleted_by:String,
    pub requires:BTreeSet<String>,
    pub latexargs:BTreeMap<String,LatexArgument>,
    pub multipar:bool,
    pub custompars:bool,
    pub forceplain:bool,
    pub passthru:bool,
    pub parbreakisnewline:bool,
    pub freespacing:bool,
    pub keepempty:bool,
    pub needprotect:bool,
    pub content_as_label:bool,
    pub display:bool,
    pub intoc:bool,
    pub is_toc_caption:bool,
    pub spellcheck:bool,
    pub resetsfont:bool
}

lazy_static! {
    static ref PLAIN : InsetLayout = InsetLayout::new("Plain");
}

impl InsetLayout {
    pub fn new(name:&str) -> Self {
        InsetLayout {
            name:name.to_string(), lyxtype:InsetLyXType::Standard,
            latextype:InsetLatexType::NoLatexType, decoration:InsetDecoration::Default,
            labelstring:"UNDEFINED".to_string(), latexname:String::new(), latexparam:String::new(),
            font:FontInfo::default(), labelfont:FontInfo::default(), bgcolor:"error".to_string(),
            preamble:String::new(), refprefix:String::new(), htmltag:String::new(),
            htmlattr:String::new(), htmlstyle:String::new(), obsoleted_by:String::new(),
            requires:BTreeSet::new(), latexargs:BTreeMap::new(),
            multipar:true, custompars:true, forceplain:false, passthru:false,
            parbreakisnewline:false, freespacing:false, keepempty:false, needprotect:false,
            content_as_label:false, display:true, intoc:false, is_toc_caption:true,
            spellcheck:true, resetsfont:false
        }
    }

    /// The layout used for insets nobody declared.
    pub fn plain() -> &'static InsetLayout { &PLAIN }

    /// Reads an inset layout body up to its `End`. Returns `false` if anything was rejected.
    pub fn read(&mut self,lex:&mut Lexer,tclass:&TextClass) -> bool {
        let mut error = false;
        let mut lex = lex.scoped_table(&INSET_TAGS);
        loop {
            let tag = match lex.lex_tag::<InsetTag>() {
                Tagged::Eof => {
                    lex.print_error(&format!("InsetLayout `{}' is not terminated by End",self.name));
                    return false
                }
                Tagged::Unknown => {
                    lex.print_error("Unknown InsetLayout tag `$$Token'");
                    error = true;
                    continue
                }
                Tagged::Tag(InsetTag::End) => break,
                Tagged::Tag(t) => t
            };
            match tag {
                InsetTag::CopyStyle | InsetTag::ObsoletedBy => {
                    if !lex.next(false) { continue }
                    let style = normalize_name(lex.get_string());
                    match tclass.inset_layouts().get(&style) {
                        Some(other) => {
                            let name = std::mem::take(&mut self.name);
                            *self = other.clone();
                            self.name = name;
                            if tag == InsetTag::ObsoletedBy { self.obsoleted_by = style }
                            else { self.obsoleted_by.clear() }
                        }
                        None => lex.print_error(&format!("Cannot copy unknown InsetLayout `{}'!",style))
                    }
                }
                InsetTag::Argument => error |= !read_argument(&mut lex,&mut self.latexargs),
                InsetTag::Font => {
                    let (f,ok) = FontInfo::read(&mut lex,self.font.clone());
                    self.font = f;
                    self.labelfont = self.font.clone();
                    error |= !ok;
                }
                InsetTag::LabelFont => {
                    let (f,ok) = FontInfo::read(&mut lex,self.labelfont.clone());
                    self.labelfont = f;
                    error |= !ok;
                }
                InsetTag::Preamble => self.preamble = lex.get_long_string("EndPreamble"),
                InsetTag::HtmlStyle => self.htmlstyle = lex.get_long_string("EndHTMLStyle"),
                InsetTag::Requires => {
                    if lex.eat_line() {
                        self.requires.extend(vector_from_string(lex.get_string(),','))
                    }
                }
                t => {
                    if !lex.next(false) { continue }
                    error |= !self.set_value(t,&lex);
                }
            }
        }
        !error
    }

    fn set_value(&mut self,tag:InsetTag,lex:&Lexer) -> bool {
        match tag {
            InsetTag::LyxType => {
                if !lex.parse_into(&mut self.lyxtype,"LyXType") { return false }
                if self.lyxtype == InsetLyXType::CharStyle {
                    self.multipar = false;
                    self.forceplain = true;
                }
            }
            InsetTag::LatexType => return lex.parse_into(&mut self.latextype,"LatexType"),
            InsetTag::Decoration => return lex.parse_into(&mut self.decoration,"Decoration"),
            InsetTag::LabelString => self.labelstring = lex.get_doc_string(),
            InsetTag::LatexName => self.latexname = lex.get_string().to_string(),
            InsetTag::LatexParam => self.latexparam = lex.get_string().replace("&quot;","\""),
            InsetTag::BgColor => self.bgcolor = lex.get_string().to_ascii_lowercase(),
            InsetTag::RefPrefix => self.refprefix = lex.get_doc_string(),
            InsetTag::HtmlTag => self.htmltag = lex.get_string().to_string(),
            InsetTag::HtmlAttr => self.htmlattr = lex.get_string().to_string(),
            InsetTag::MultiPar => self.multipar = lex.get_bool(),
            InsetTag::CustomPars => self.custompars = lex.get_bool(),
            InsetTag::ForcePlain => self.forceplain = lex.get_bool(),
            InsetTag::PassThru => self.passthru = lex.get_bool(),
            InsetTag::ParbreakIsNewline => self.parbreakisnewline = lex.get_bool(),
            InsetTag::FreeSpacing => self.freespacing = lex.get_bool(),
            InsetTag::KeepEmpty => self.keepempty = lex.get_bool(),
            InsetTag::NeedProtect => self.needprotect = lex.get_bool(),
            InsetTag::ContentAsLabel => self.content_as_label = lex.get_bool(),
            InsetTag::Display => self.display = lex.get_bool(),
            InsetTag::InToc => self.intoc = lex.get_bool(),
            InsetTag::IsTocCaption => self.is_toc_caption = lex.get_bool(),
            InsetTag::Spellcheck => self.spellcheck = lex.get_bool(),
            InsetTag::ResetsFont => self.resetsfont = lex.get_bool(),
            _ => ()
        }
        true
    }
}

/// Looks `name` up in `layouts`, following `ObsoletedBy` forwards. If `name` is unknown and
/// has a generic prefix (`Flex:Foo` → `Flex`), the prefix is tried next; failing everything,
/// the [plain](InsetLayout::plain) layout is returned.
pub fn lookup<'a>(layouts:&'a InsetLayouts,name:&str) -> &'a InsetLayout {
    let mut n = name.to_string();
    let mut seen : Vec<String> = Vec::new();
    while !n.is_empty() {
        if let Some(il) = layouts.get(&n) {
            if il.obsoleted_by.is_empty() { return il }
            if seen.contains(&n) {
                log::warn!(target:"tclass","InsetLayout `{}' is obsoleted in a cycle",n);
                return il
            }
            seen.push(std::mem::replace(&mut n,il.obsoleted_by.clone()));
            continue
        }
        match n.find(':') {
            Some(i) => n.truncate(i),
            None => break
        }
    }
    InsetLayout::plain()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layouts() -> InsetLayouts {
        let mut ret = InsetLayouts::new();
        ret.insert("Note".to_string(),InsetLayout::new("Note"));
        ret.insert("Note:Comment".to_string(),InsetLayout::new("Note:Comment"));
        let mut old = InsetLayout::new("Flex:Old");
        old.obsoleted_by = "Flex:New".to_string();
        ret.insert(old.name.clone(),old);
        ret.insert("Flex:New".to_string(),InsetLayout::new("Flex:New"));
        let mut a = InsetLayout::new("Loop:A");
        a.obsoleted_by = "Loop:B".to_string();
        let mut b = InsetLayout::new("Loop:B");
        b.obsoleted_by = "Loop:A".to_string();
        ret.insert(a.name.clone(),a);
        ret.insert(b.name.clone(),b);
        ret
    }

    #[test]
    fn lookup_falls_back_to_prefix_then_plain() {
        let ls = layouts();
        assert_eq!(lookup(&ls,"Note:Comment").name,"Note:Comment");
        assert_eq!(lookup(&ls,"Note:Greyedout").name,"Note");
        assert_eq!(lookup(&ls,"Flex:Old").name,"Flex:New");
        assert_eq!(lookup(&ls,"Caption:Wibble").name,"Plain");
        assert_eq!(lookup(&ls,"").name,"Plain");
        // a forwarding cycle terminates
        assert!(lookup(&ls,"Loop:A").name.starts_with("Loop:"));
    }

    #[test]
    fn read_inset_layout() {
        let tclass = TextClass::new("test");
        let mut lex = Lexer::from_str("<inset>",r#"
            LyXType     charstyle
            LabelString "Code"
            LatexType   Command
            LatexName   code
            Decoration  Conglomerate
            Requires    listings
            Argument 1
              LabelString "Options"
            EndArgument
          End"#);
        let mut il = InsetLayout::new("Flex:Code");
        assert!(il.read(&mut lex,&tclass));
        assert_eq!(il.lyxtype,InsetLyXType::CharStyle);
        assert!(!il.multipar && il.forceplain);
        assert_eq!(il.latextype,InsetLatexType::Command);
        assert_eq!(il.decoration,InsetDecoration::Conglomerate);
        assert!(il.requires.contains("listings"));
        assert_eq!(il.latexargs.len(),1);
    }
}
