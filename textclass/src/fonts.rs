/*! Font descriptions as used by `Font`, `TextFont`, `LabelFont` and `DefaultFont` blocks.

Every attribute can be left at `Inherit`, in which case [`FontInfo::realize`] fills it in from
an enclosing font (ultimately the class's `DefaultFont`).
*/

use strum::{Display, EnumString};
use crate::lexer::{keywords, Lexer, Tagged};

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum FontFamily { Roman, Sans, Typewriter, Symbol, #[default] Inherit, Ignore }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum FontSeries { Medium, Bold, #[default] Inherit, Ignore }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum FontShape { Up, Italic, Slanted, SmallCaps, #[default] Inherit, Ignore }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum FontSize {
    Tiny, ScriptSize, FootnoteSize, Small, Normal, Large, Larger, Largest, Huge, Giant,
    Increase, Decrease, #[default] Inherit, Ignore
}

/// On/off attributes (`Misc emph`, `Misc no_bar`, ...).
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub enum FontState { Off, On, Toggle, #[default] Inherit, Ignore }

#[derive(Clone,Debug,PartialEq,Eq,Default)]
pub struct FontInfo {
    pub family:FontFamily,
    pub series:FontSeries,
    pub shape:FontShape,
    pub size:FontSize,
    pub emph:FontState,
    pub underbar:FontState,
    pub strikeout:FontState,
    pub noun:FontState,
    /// `None` inherits.
    pub color:Option<String>
}

keywords! { enum FontTag in FONT_TAGS {
    "color" => Color, "endfont" => EndFont, "family" => Family, "misc" => Misc,
    "series" => Series, "shape" => Shape, "size" => Size
}}

impl FontInfo {
    /// A fully specified upright roman font of normal size; fallback for `DefaultFont`.
    pub fn sane() -> Self {
        FontInfo {
            family:FontFamily::Roman, series:FontSeries::Medium, shape:FontShape::Up,
            size:FontSize::Normal, emph:FontState::Off, underbar:FontState::Off,
            strikeout:FontState::Off, noun:FontState::Off, color:Some("none".to_string())
        }
    }

    /// Whether no attribute is left at `Inherit`.
    pub fn resolved(&self) -> bool {
        self.family != FontFamily::Inherit && self.series != FontSeries::Inherit
            && self.shape != FontShape::Inherit && self.size != FontSize::Inherit
            && [self.emph,self.underbar,self.strikeout,self.noun].iter().all(|s| *s != FontState::Inherit)
            && self.color.is_some()
    }

    /// Replaces every inherited attribute by the one of `other`.
    pub fn realize(&mut self,other:&FontInfo) -> &mut Self {
        if self.family == FontFamily::Inherit { self.family = other.family }
        if self.series == FontSeries::Inherit { self.series = other.series }
        if self.shape == FontShape::Inherit { self.shape = other.shape }
        if self.size == FontSize::Inherit { self.size = other.size }
        for (s,o) in [(&mut self.emph,other.emph),(&mut self.underbar,other.underbar),
                      (&mut self.strikeout,other.strikeout),(&mut self.noun,other.noun)] {
            if *s == FontState::Inherit { *s = o }
        }
        if self.color.is_none() { self.color.clone_from(&other.color) }
        self
    }

    /// Reads the body of a font block up to `EndFont`, starting from `base`.
    /// Returns `false` if anything in the block was not understood.
    pub fn read(lex:&mut Lexer,base:FontInfo) -> (FontInfo,bool) {
        let mut font = base;
        let mut ok = true;
        let mut lex = lex.scoped_table(&FONT_TAGS);
        loop {
            let tag = match lex.lex_tag::<FontTag>() {
                Tagged::Eof => {
                    lex.print_error("Missing EndFont");
                    return (font,false)
                }
                Tagged::Unknown => {
                    lex.print_error("Unknown tag `$$Token'");
                    ok = false;
                    continue
                }
                Tagged::Tag(t) => t
            };
            if tag == FontTag::EndFont { return (font,ok) }
            if !lex.next(false) { continue }
            ok &= match tag {
                FontTag::Family => lex.parse_into(&mut font.family,"family"),
                FontTag::Series => lex.parse_into(&mut font.series,"series"),
                FontTag::Shape => lex.parse_into(&mut font.shape,"shape"),
                FontTag::Size => lex.parse_into(&mut font.size,"size"),
                FontTag::Color => { font.color = Some(lex.get_string().to_ascii_lowercase()); true }
                FontTag::Misc => font.set_misc(&lex),
                FontTag::EndFont => true
            }
        }
    }

    fn set_misc(&mut self,lex:&Lexer) -> bool {
        let v = lex.get_string().to_ascii_lowercase();
        let (state,name) = match v.strip_prefix("no_") {
            Some(n) => (FontState::Off,n),
            None => (FontState::On,v.as_str())
        };
        match name {
            "emph" => self.emph = state,
            "underbar" | "bar" => self.underbar = state,
            "strikeout" => self.strikeout = state,
            "noun" => self.noun = state,
            _ => {
                lex.print_error("Unknown font attribute `$$Token'");
                return false
            }
        }
        true
    }
}
