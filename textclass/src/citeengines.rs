/*! Citation engines: the registry read from `lyxciteengines.lst`.

An engine (`natbib`, `biblatex`, ...) is a `.citeengine` file layered on a document class
with [`ReadType::CiteEngine`](crate::textclass::ReadType::CiteEngine). The registry only
carries the catalog data needed to offer and check engines.
*/

use std::cell::OnceCell;
use log::{debug, info, warn};
use crate::citations::CiteEngineType;
use crate::lexer::{LexCode, Lexer};
use crate::packages::PackageOracle;
use crate::paths::SearchPaths;
use crate::utils::errors::LayoutError;
use crate::utils::{quote, split_once_or_all, string_from_vector, vector_from_string};

/// One entry of `lyxciteengines.lst`.
#[derive(Clone,Debug)]
pub struct LyXCiteEngine {
    name:String,
    id:String,
    filename:String,
    engine_types:Vec<String>,
    default_biblios:Vec<String>,
    description:String,
    package_list:Vec<String>,
    required_engines:Vec<String>,
    excluded_engines:Vec<String>,
    missing:OnceCell<Vec<String>>
}

impl LyXCiteEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(name:&str,id:&str,engine_types:Vec<String>,default_biblios:Vec<String>,description:&str,
               packages:Vec<String>,requires:Vec<String>,excludes:Vec<String>) -> Self {
        LyXCiteEngine {
            name:name.to_string(), id:id.to_string(), filename:format!("{}.citeengine",id),
            engine_types, default_biblios, description:description.to_string(),
            package_list:packages, required_engines:requires, excluded_engines:excludes,
            missing:OnceCell::new()
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn id(&self) -> &str { &self.id }
    pub fn filename(&self) -> &str { &self.filename }
    /// `authoryear`, `numerical` and/or `default`.
    pub fn engine_types(&self) -> &[String] { &self.engine_types }
    pub fn default_biblios(&self) -> &[String] { &self.default_biblios }
    pub fn description(&self) -> &str { &self.description }
    pub fn package_list(&self) -> &[String] { &self.package_list }
    pub fn required_engines(&self) -> &[String] { &self.required_engines }
    pub fn excluded_engines(&self) -> &[String] { &self.excluded_engines }

    pub fn has_engine_type(&self,t:CiteEngineType) -> bool {
        self.engine_types.iter().any(|s| CiteEngineType::parse_name(s) == Some(t))
    }

    /** The default bibliography style for `t`: the first entry scoped to it
     (`authoryear:plainnat`), else the first unscoped entry, else the empty string.
    */
    pub fn get_default_biblio(&self,t:CiteEngineType) -> &str {
        let mut unscoped = None;
        for db in &self.default_biblios {
            match db.split_once(':') {
                Some((ty,style)) if CiteEngineType::parse_name(ty) == Some(t) => return style,
                Some(_) => (),
                None => { unscoped.get_or_insert(db.as_str()); }
            }
        }
        unscoped.unwrap_or("")
    }

    /// Whether `bib` is one of the engine's default bibliography styles, for any type.
    pub fn is_default_biblio(&self,bib:&str) -> bool {
        self.default_biblios.iter().any(|db| {
            let (a,b) = split_once_or_all(db,':');
            if b.is_empty() { a == bib } else { b == bib }
        })
    }

    /// Whether all required LaTeX packages are installed; checked once, then cached.
    pub fn is_available(&self,oracle:&dyn PackageOracle) -> bool {
        self.missing.get_or_init(|| {
            self.package_list.iter().filter(|p| !oracle.is_available(p)).cloned().collect()
        }).is_empty()
    }
    /// The packages found missing by [`is_available`](Self::is_available).
    pub fn prerequisites(&self) -> &[String] {
        self.missing.get().map_or(&[],Vec::as_slice)
    }

    /// Whether neither engine excludes the other; see [`CiteEnginesList::are_compatible`].
    pub fn is_compatible(&self,other:&str,registry:&CiteEnginesList) -> bool {
        if self.excluded_engines.iter().any(|e| e == other) { return false }
        match registry.get(other) {
            None => true,
            Some(ce) => !ce.excluded_engines.iter().any(|e| *e == self.id)
        }
    }

    /// The `lyxciteengines.lst` line describing this engine.
    pub fn to_catalog_record(&self) -> String {
        format!("{} {} {} {} {} {} {} {}",quote(&self.name),quote(&self.id),
            quote(&string_from_vector(&self.engine_types,"|")),quote(&string_from_vector(&self.default_biblios,"|")),
            quote(&self.description),quote(&string_from_vector(&self.package_list,",")),
            quote(&string_from_vector(&self.required_engines,"|")),quote(&string_from_vector(&self.excluded_engines,"|")))
    }
}

/// The registry of citation engines, sorted by display name.
#[derive(Clone,Debug,Default)]
pub struct CiteEnginesList {
    engines:Vec<LyXCiteEngine>
}

impl CiteEnginesList {
    /// Reads `lyxciteengines.lst` from the search roots.
    pub fn read(&mut self,paths:&SearchPaths) -> Result<(),LayoutError> {
        let Some(file) = paths.lib_file_search("","lyxciteengines.lst","") else {
            warn!(target:"citeengines","Unable to find cite engines file `lyxciteengines.lst'; try reconfiguring");
            return Err(LayoutError::CatalogNotFound("lyxciteengines.lst".to_string()))
        };
        debug!(target:"citeengines","Reading cite engines from `{}'",file.display());
        let mut lex = Lexer::new();
        lex.set_file(&file)?;
        self.read_catalog(&mut lex);
        Ok(())
    }

    /// Reads catalog records from `text` (the `lyxciteengines.lst` format).
    pub fn read_catalog_str(&mut self,text:&str) {
        self.read_catalog(&mut Lexer::from_str("lyxciteengines.lst",text))
    }

    fn read_catalog(&mut self,lex:&mut Lexer) {
        loop {
            if lex.lex() == LexCode::Feof { break }
            let name = lex.get_string().to_string();
            let mut fields = Vec::with_capacity(7);
            while fields.len() < 7 && lex.next(true) { fields.push(lex.get_string().to_string()) }
            let Ok([id,types,biblios,desc,pkgs,req,exc]) = <[String;7]>::try_from(fields) else {
                lex.print_error("Incomplete cite engine record `$$Token'");
                break
            };
            debug!(target:"citeengines","Cite engine {} ({}): types {}, default biblios {}",name,id,types,biblios);
            self.engines.retain(|e| e.id != id);
            self.engines.push(LyXCiteEngine::new(&name,&id,vector_from_string(&types,'|'),
                vector_from_string(&biblios,'|'),&desc,vector_from_string(&pkgs,','),
                vector_from_string(&req,'|'),vector_from_string(&exc,'|')));
        }
        self.engines.sort_by(|a,b| a.name.cmp(&b.name));
        info!(target:"citeengines","{} cite engines registered",self.engines.len());
    }

    pub fn get(&self,id:&str) -> Option<&LyXCiteEngine> { self.engines.iter().find(|e| e.id == id) }
    pub fn iter(&self) -> std::slice::Iter<'_,LyXCiteEngine> { self.engines.iter() }
    pub fn len(&self) -> usize { self.engines.len() }
    pub fn is_empty(&self) -> bool { self.engines.is_empty() }

    /** Whether `a` and `b` can be used together. Only `a` is asked if it is registered
     (it consults `b`'s exclusions itself); `b` is asked only if `a` is unknown.
    */
    pub fn are_compatible(&self,a:&str,b:&str) -> bool {
        if let Some(ce) = self.get(a) { return ce.is_compatible(b,self) }
        if let Some(ce) = self.get(b) { return ce.is_compatible(a,self) }
        true
    }

    /// The catalog in `lyxciteengines.lst` format.
    pub fn to_catalog(&self) -> String {
        self.engines.iter().map(|e| e.to_catalog_record() + "\n").collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageList;

    const CATALOG: &str = r#"
"Natbib" "natbib" "authoryear|numerical" "authoryear:plainnat|numerical:plainnat|plain" "Natbib" "natbib" "" "jurabib"
"Jurabib" "jurabib" "authoryear" "jurabib" "Jurabib" "jurabib" "" ""
"Basic" "basic" "default" "plain|numerical:unsrt" "Basic" "" "" ""
"#;

    #[test]
    fn engine_records() {
        let mut cl = CiteEnginesList::default();
        cl.read_catalog_str(CATALOG);
        assert_eq!(cl.iter().map(LyXCiteEngine::id).collect::<Vec<_>>(),vec!["basic","jurabib","natbib"]);
        let natbib = cl.get("natbib").unwrap();
        assert_eq!(natbib.filename(),"natbib.citeengine");
        assert!(natbib.has_engine_type(CiteEngineType::NUMERICAL));
        assert!(!cl.get("jurabib").unwrap().has_engine_type(CiteEngineType::NUMERICAL));
        assert!(cl.get("basic").unwrap().has_engine_type(CiteEngineType::DEFAULT));
        assert!(natbib.is_default_biblio("plain") && natbib.is_default_biblio("plainnat"));
        assert!(!natbib.is_default_biblio("authoryear"));

        let pl : PackageList = ["natbib"].into_iter().collect();
        assert!(natbib.is_available(&pl));
        let jurabib = cl.get("jurabib").unwrap();
        assert!(!jurabib.is_available(&pl));
        assert_eq!(jurabib.prerequisites(),&["jurabib".to_string()]);
        // cached for the session
        assert!(!jurabib.is_available(&crate::packages::AllAvailable));
    }

    #[test]
    fn default_biblios() {
        let mut cl = CiteEnginesList::default();
        cl.read_catalog_str(CATALOG);
        let natbib = cl.get("natbib").unwrap();
        assert_eq!(natbib.get_default_biblio(CiteEngineType::AUTHORYEAR),"plainnat");
        assert_eq!(natbib.get_default_biblio(CiteEngineType::DEFAULT),"plain");
        let basic = cl.get("basic").unwrap();
        assert_eq!(basic.get_default_biblio(CiteEngineType::NUMERICAL),"unsrt");
        assert_eq!(basic.get_default_biblio(CiteEngineType::AUTHORYEAR),"plain");
        let none = LyXCiteEngine::new("x","x",vec![],vec![],"",vec![],vec![],vec![]);
        assert_eq!(none.get_default_biblio(CiteEngineType::AUTHORYEAR),"");
    }

    #[test]
    fn natbib_excludes_jurabib_from_both_sides() {
        let mut cl = CiteEnginesList::default();
        cl.read_catalog_str(CATALOG);
        assert!(!cl.are_compatible("natbib","jurabib"));
        assert!(!cl.are_compatible("jurabib","natbib"));
        assert!(cl.are_compatible("basic","natbib"));
        assert!(cl.are_compatible("biblatex","natbib"));
        assert!(cl.are_compatible("a","b"));
    }

    #[test]
    fn records_round_trip() {
        let mut cl = CiteEnginesList::default();
        cl.read_catalog_str(CATALOG);
        let mut again = CiteEnginesList::default();
        again.read_catalog_str(&cl.to_catalog());
        assert_eq!(again.len(),3);
        for (a,b) in cl.iter().zip(again.iter()) {
            assert_eq!(a.name(),b.name());
            assert_eq!(a.description(),b.description());
            assert_eq!(a.engine_types(),b.engine_types());
            assert_eq!(a.default_biblios(),b.default_biblios());
            assert_eq!(a.excluded_engines(),b.excluded_engines());
        }
    }
}
