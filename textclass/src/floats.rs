/*! Float types (`Float ... End`) of a class. */

use std::collections::{BTreeMap, BTreeSet};
use log::warn;
use crate::lexer::{keywords, Lexer, Tagged};
use crate::utils::vector_from_string;

#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Floating {
    pub floattype:String,
    pub placement:String,
    pub allowed_placement:String,
    pub ext:String,
    /// The counter float numbers are reset by; empty if none.
    pub within:String,
    pub style:String,
    pub name:String,
    pub listname:String,
    pub listcommand:String,
    pub refprefix:String,
    pub htmltag:String,
    pub htmlattr:String,
    pub htmlstyle:String,
    pub requires:BTreeSet<String>,
    pub usesfloatpkg:bool,
    pub ispredefined:bool,
    pub allowswide:bool,
    pub allowssideways:bool
}

impl Floating {
    pub fn new(floattype:&str) -> Self {
        Floating {
            floattype:floattype.to_string(), placement:String::new(),
            allowed_placement:"!htbpH".to_string(), ext:String::new(), within:String::new(),
            style:String::new(), name:String::new(), listname:String::new(),
            listcommand:String::new(), refprefix:String::new(), htmltag:String::new(),
            htmlattr:String::new(), htmlstyle:String::new(), requires:BTreeSet::new(),
            usesfloatpkg:true, ispredefined:false, allowswide:true, allowssideways:true
        }
    }

    /** Reads a float body up to its `End`. A `Type` naming an already known float starts
     from a copy of that float, so later blocks only override what they mention.
     Returns `None` if the block is not terminated.
    */
    pub fn read(lex:&mut Lexer,known:&FloatList) -> Option<Floating> {
        let mut fl = Floating::new("");
        let mut lex = lex.scoped_table(&FLOAT_TAGS);
        loop {
            let tag = match lex.lex_tag::<FloatTag>() {
                Tagged::Eof => {
                    lex.print_error("Float is not terminated by End");
                    return None
                }
                Tagged::Unknown => {
                    lex.print_error("Unknown float tag `$$Token'");
                    continue
                }
                Tagged::Tag(FloatTag::End) => break,
                Tagged::Tag(t) => t
            };
            if tag == FloatTag::HtmlStyle {
                fl.htmlstyle = lex.get_long_string("EndHTMLStyle");
                continue
            }
            if tag == FloatTag::Requires {
                if lex.eat_line() { fl.requires.extend(vector_from_string(lex.get_string(),',')) }
                continue
            }
            if !lex.next(false) { continue }
            let value = lex.get_string().to_string();
            match tag {
                FloatTag::Type => {
                    match known.get(&value) {
                        Some(existing) => fl = existing.clone(),
                        None => fl.floattype = value
                    }
                }
                FloatTag::Name => fl.name = value,
                FloatTag::Placement => fl.placement = value,
                FloatTag::AllowedPlacement => fl.allowed_placement = value,
                FloatTag::Ext => fl.ext = value,
                FloatTag::Within => fl.within = if value == "none" { String::new() } else { value },
                FloatTag::Style => fl.style = value,
                FloatTag::ListCommand => fl.listcommand = value,
                FloatTag::RefPrefix => fl.refprefix = value,
                FloatTag::ListName => fl.listname = lex.get_doc_string(),
                FloatTag::HtmlTag => fl.htmltag = value,
                FloatTag::HtmlAttr => fl.htmlattr = value,
                FloatTag::UsesFloatPkg => fl.usesfloatpkg = lex.get_bool(),
                FloatTag::IsPredefined => fl.ispredefined = lex.get_bool(),
                FloatTag::AllowsWide => fl.allowswide = lex.get_bool(),
                FloatTag::AllowsSideways => fl.allowssideways = lex.get_bool(),
                FloatTag::End | FloatTag::HtmlStyle | FloatTag::Requires => ()
            }
        }
        if fl.floattype.is_empty() {
            lex.print_error("Float without Type");
            return None
        }
        if !fl.usesfloatpkg && fl.listcommand.is_empty() && !known.iter().any(|(_,f)| f.ext == fl.ext) {
            warn!(target:"tclass","The layout does not provide a list command for the float `{}'; \
                no list of these floats can be produced.",fl.floattype);
        }
        Some(fl)
    }
}

keywords! { enum FloatTag in FLOAT_TAGS {
    "allowedplacement" => AllowedPlacement,
    "allowssideways" => AllowsSideways,
    "allowswide" => AllowsWide,
    "end" => End,
    "extension" => Ext,
    "guiname" => Name,
    "htmlattr" => HtmlAttr,
    "htmlstyle" => HtmlStyle,
    "htmltag" => HtmlTag,
    "ispredefined" => IsPredefined,
    "listcommand" => ListCommand,
    "listname" => ListName,
    "numberwithin" => Within,
    "placement" => Placement,
    "refprefix" => RefPrefix,
    "requires" => Requires,
    "style" => Style,
    "type" => Type,
    "usesfloatpkg" => UsesFloatPkg,
}}

/// The floats of a class, by type.
#[derive(Clone,Debug,PartialEq,Eq,Default)]
pub struct FloatList {
    list:BTreeMap<String,Floating>
}
impl FloatList {
    /// Adds `fl`, replacing any float of the same type.
    pub fn new_float(&mut self,fl:Floating) {
        self.list.insert(fl.floattype.clone(),fl);
    }
    pub fn type_exists(&self,t:&str) -> bool { self.list.contains_key(t) }
    pub fn get(&self,t:&str) -> Option<&Floating> { self.list.get(t) }
    pub fn erase(&mut self,t:&str) -> bool { self.list.remove(t).is_some() }
    pub fn iter(&self) -> impl Iterator<Item=(&String,&Floating)> { self.list.iter() }
    pub fn len(&self) -> usize { self.list.len() }
    pub fn is_empty(&self) -> bool { self.list.is_empty() }
}
