/*! Counters (`Counter ... End`) and their master/slave relations. */

use std::collections::BTreeMap;
use log::{debug, warn};
use crate::lexer::{keywords, Lexer, Tagged};

#[derive(Clone,Debug,PartialEq,Eq,Default)]
pub struct Counter {
    /// The counter this one is reset by; empty if none.
    pub master:String,
    pub labelstring:String,
    pub labelstring_appendix:String,
    pub prettyformat:String,
    pub guiname:String,
    pub latexname:String,
    pub initial_value:i32
}

keywords! { enum CounterTag in COUNTER_TAGS {
    "end" => End,
    "guiname" => GuiName,
    "initialvalue" => InitialValue,
    "labelstring" => LabelString,
    "labelstringappendix" => LabelStringAppendix,
    "latexname" => LatexName,
    "prettyformat" => PrettyFormat,
    "within" => Within,
}}

impl Counter {
    pub fn new(master:&str,labelstring:&str,labelstring_appendix:&str,guiname:&str) -> Self {
        Counter {
            master:master.to_string(),
            labelstring:labelstring.to_string(),
            labelstring_appendix:labelstring_appendix.to_string(),
            guiname:guiname.to_string(),
            ..Counter::default()
        }
    }

    /// Reads a counter body up to its `End`.
    pub fn read(&mut self,lex:&mut Lexer) -> bool {
        let mut ok = true;
        let mut lex = lex.scoped_table(&COUNTER_TAGS);
        loop {
            let tag = match lex.lex_tag::<CounterTag>() {
                Tagged::Eof => {
                    lex.print_error("Counter is not terminated by End");
                    return false
                }
                Tagged::Unknown => {
                    lex.print_error("Unknown counter tag `$$Token'");
                    ok = false;
                    continue
                }
                Tagged::Tag(CounterTag::End) => return ok,
                Tagged::Tag(t) => t
            };
            if !lex.next(false) { continue }
            match tag {
                CounterTag::Within => {
                    self.master = lex.get_doc_string();
                    if self.master == "none" { self.master.clear() }
                }
                CounterTag::InitialValue => {
                    // negative start values make no sense
                    self.initial_value = lex.get_integer().max(0)
                }
                CounterTag::LabelString => self.labelstring = lex.get_doc_string(),
                CounterTag::LabelStringAppendix => self.labelstring_appendix = lex.get_doc_string(),
                CounterTag::PrettyFormat => self.prettyformat = lex.get_doc_string(),
                CounterTag::GuiName => self.guiname = lex.get_doc_string(),
                CounterTag::LatexName => self.latexname = lex.get_doc_string(),
                CounterTag::End => ()
            }
        }
    }
}

/// All counters of a class, by name.
#[derive(Clone,Debug,PartialEq,Eq,Default)]
pub struct Counters {
    list:BTreeMap<String,Counter>
}

impl Counters {
    pub fn has_counter(&self,name:&str) -> bool { self.list.contains_key(name) }
    pub fn get(&self,name:&str) -> Option<&Counter> { self.list.get(name) }
    pub fn iter(&self) -> impl Iterator<Item=(&String,&Counter)> { self.list.iter() }
    pub fn len(&self) -> usize { self.list.len() }
    pub fn is_empty(&self) -> bool { self.list.is_empty() }

    /// Adds a counter; fails if it exists already or its master does not.
    pub fn new_counter(&mut self,name:&str,master:&str,labelstring:&str,labelstring_appendix:&str,guiname:&str) -> bool {
        if !master.is_empty() && !self.has_counter(master) {
            warn!(target:"tclass","Master counter `{}' of `{}' does not exist",master,name);
            return false
        }
        if self.has_counter(name) { return false }
        self.list.insert(name.to_string(),Counter::new(master,labelstring,labelstring_appendix,guiname));
        true
    }

    /// Reads a `Counter` body for `name`. Existing counters are modified; new ones are only
    /// kept if `make_new` (`IfCounter` reads with `make_new = false`).
    pub fn read(&mut self,lex:&mut Lexer,name:&str,make_new:bool) -> bool {
        if let Some(c) = self.list.get_mut(name) {
            debug!(target:"tclass","Reading existing counter {}",name);
            return c.read(lex)
        }
        debug!(target:"tclass","Reading new counter {}",name);
        let mut c = Counter::default();
        let ok = c.read(lex);
        if !ok {
            warn!(target:"tclass","Error reading counter `{}'!",name)
        } else if make_new {
            self.list.insert(name.to_string(),c);
        }
        ok
    }

    /// Removes a counter; counters it was the master of become top-level counters.
    pub fn remove(&mut self,name:&str) -> bool {
        if self.list.remove(name).is_none() { return false }
        for c in self.list.values_mut() {
            if c.master == name { c.master.clear() }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masters_must_exist() {
        let mut cs = Counters::default();
        assert!(!cs.new_counter("subsection","section","","",""));
        assert!(cs.new_counter("section","","\\arabic{section}","\\Alph{section}",""));
        assert!(cs.new_counter("subsection","section","","",""));
        assert!(!cs.new_counter("section","","","",""));
        assert!(cs.remove("section"));
        assert_eq!(cs.get("subsection").map(|c| c.master.as_str()),Some(""));
        assert!(!cs.remove("section"));
    }

    #[test]
    fn read_new_and_modify_only() {
        let mut cs = Counters::default();
        let mut lex = Lexer::from_str("t",
            "Within none\n LabelString \"\\arabic{example}\"\n InitialValue -4\nEnd\n\
             LabelString \"x\"\nEnd\n\
             PrettyFormat \"Example ##\"\nEnd");
        assert!(cs.read(&mut lex,"example",true));
        let c = cs.get("example").unwrap();
        assert_eq!(c.master,"");
        assert_eq!(c.labelstring,"\\arabic{example}");
        assert_eq!(c.initial_value,0);
        // IfCounter on an unknown counter reads and discards
        assert!(cs.read(&mut lex,"other",false));
        assert!(!cs.has_counter("other"));
        // IfCounter on a known counter modifies it
        assert!(cs.read(&mut lex,"example",false));
        assert_eq!(cs.get("example").unwrap().prettyformat,"Example ##");
    }
}
