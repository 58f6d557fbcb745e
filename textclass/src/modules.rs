/*! Layout modules: the registry of available modules ([`ModuleList`], read from
`lyxmodules.lst`) and a document's selection of modules ([`LayoutModuleList`]).

A selection has to be consistent with its document class and with itself: no module that
the class provides or excludes, no two modules excluding each other, and every module with
requirements preceded by one of the modules it requires (or a module the class provides).
[`LayoutModuleList::adapt_to_base_class`] repairs a selection after the class changed; it
never fails, it only drops modules and logs why.
*/

use std::cell::OnceCell;
use std::ops::Deref;
use log::{debug, info, warn};
use crate::lexer::{LexCode, Lexer};
use crate::packages::PackageOracle;
use crate::paths::SearchPaths;
use crate::textclass::TextClass;
use crate::utils::errors::LayoutError;
use crate::utils::{quote, string_from_vector, vector_from_string};

/// One entry of `lyxmodules.lst`.
#[derive(Clone,Debug)]
pub struct LyXModule {
    name:String,
    id:String,
    filename:String,
    description:String,
    package_list:Vec<String>,
    required_modules:Vec<String>,
    excluded_modules:Vec<String>,
    category:String,
    local:bool,
    /// Packages found missing on the first availability check.
    missing:OnceCell<Vec<String>>
}

impl LyXModule {
    pub fn new(name:&str,id:&str,description:&str,packages:Vec<String>,requires:Vec<String>,
               excludes:Vec<String>,category:&str,local:bool) -> Self {
        LyXModule {
            name:name.to_string(), id:id.to_string(), filename:format!("{}.module",id),
            description:description.to_string(), package_list:packages,
            required_modules:requires, excluded_modules:excludes, category:category.to_string(),
            local, missing:OnceCell::new()
        }
    }

    /// The display name.
    pub fn name(&self) -> &str { &self.name }
    /// The identifier documents use; the module file's stem.
    pub fn id(&self) -> &str { &self.id }
    pub fn filename(&self) -> &str { &self.filename }
    pub fn description(&self) -> &str { &self.description }
    pub fn package_list(&self) -> &[String] { &self.package_list }
    /// Alternatives: any one of them satisfies the requirement.
    pub fn required_modules(&self) -> &[String] { &self.required_modules }
    pub fn excluded_modules(&self) -> &[String] { &self.excluded_modules }
    pub fn category(&self) -> &str { &self.category }
    pub fn is_local(&self) -> bool { self.local }

    /// Whether all required LaTeX packages are installed; checked once, then cached.
    pub fn is_available(&self,oracle:&dyn PackageOracle) -> bool {
        self.missing.get_or_init(|| {
            self.package_list.iter().filter(|p| !oracle.is_available(p)).cloned().collect()
        }).is_empty()
    }
    /// The packages found missing by [`is_available`](Self::is_available); empty before the check.
    pub fn prerequisites(&self) -> &[String] {
        self.missing.get().map_or(&[],Vec::as_slice)
    }

    /// Whether neither module excludes the other. `registry` is asked for the other
    /// module's exclusions; unknown modules exclude nothing.
    pub fn is_compatible(&self,other:&str,registry:&ModuleList) -> bool {
        if self.excluded_modules.iter().any(|m| m == other) { return false }
        match registry.get(other) {
            None => true,
            Some(lm) => !lm.excluded_modules.iter().any(|m| *m == self.id)
        }
    }

    /// The `lyxmodules.lst` line describing this module.
    pub fn to_catalog_record(&self) -> String {
        format!("{} {} {} {} {} {} {} {}",quote(&self.name),quote(&self.id),quote(&self.description),
            quote(&string_from_vector(&self.package_list,",")),quote(&string_from_vector(&self.required_modules,"|")),
            quote(&string_from_vector(&self.excluded_modules,"|")),quote(&self.category),
            quote(if self.local {"true"} else {"false"}))
    }
}

/// The registry of available modules, sorted by display name.
#[derive(Clone,Debug,Default)]
pub struct ModuleList {
    modlist:Vec<LyXModule>
}

impl ModuleList {
    /// Reads `lyxmodules.lst` from the search roots.
    pub fn read(&mut self,paths:&SearchPaths) -> Result<(),LayoutError> {
        let Some(file) = paths.lib_file_search("","lyxmodules.lst","") else {
            warn!(target:"modules","Unable to find modules file `lyxmodules.lst'; try reconfiguring");
            return Err(LayoutError::CatalogNotFound("lyxmodules.lst".to_string()))
        };
        debug!(target:"modules","Reading modules from `{}'",file.display());
        let mut lex = Lexer::new();
        lex.set_file(&file)?;
        self.read_catalog(&mut lex);
        Ok(())
    }

    /// Reads catalog records from `text` (the `lyxmodules.lst` format).
    pub fn read_catalog_str(&mut self,text:&str) {
        self.read_catalog(&mut Lexer::from_str("lyxmodules.lst",text))
    }

    fn read_catalog(&mut self,lex:&mut Lexer) {
        // name, file stem, description, packages, requires, excludes, category [, local]
        loop {
            if lex.lex() == LexCode::Feof { break }
            let name = lex.get_string().to_string();
            let mut fields = Vec::with_capacity(6);
            while fields.len() < 6 && lex.next(true) { fields.push(lex.get_string().to_string()) }
            let [id,desc,pkgs,req,exc,catgy] = match <[String;6]>::try_from(fields) {
                Ok(f) => f,
                Err(_) => {
                    lex.print_error("Incomplete module record `$$Token'");
                    break
                }
            };
            let local = !lex.at_line_end() && lex.next(true) && lex.get_string() == "true";
            debug!(target:"modules","Module {} ({}): requires {:?}, excludes {:?}",name,id,req,exc);
            self.modlist.retain(|m| m.id != id);
            self.modlist.push(LyXModule::new(&name,&id,&desc,vector_from_string(&pkgs,','),
                vector_from_string(&req,'|'),vector_from_string(&exc,'|'),&catgy,local));
        }
        self.modlist.sort_by(|a,b| a.name.cmp(&b.name));
        info!(target:"modules","{} modules registered",self.modlist.len());
    }

    pub fn get(&self,id:&str) -> Option<&LyXModule> { self.modlist.iter().find(|m| m.id == id) }
    pub fn iter(&self) -> std::slice::Iter<'_,LyXModule> { self.modlist.iter() }
    pub fn len(&self) -> usize { self.modlist.len() }
    pub fn is_empty(&self) -> bool { self.modlist.is_empty() }

    /** Whether `a` and `b` can be used together. Looks up `a` first and only falls back to
     `b` if `a` is not registered; modules neither of which is registered are compatible.
    */
    pub fn are_compatible(&self,a:&str,b:&str) -> bool {
        if let Some(lm) = self.get(a) { return lm.is_compatible(b,self) }
        if let Some(lm) = self.get(b) { return lm.is_compatible(a,self) }
        true
    }

    /// The catalog in `lyxmodules.lst` format.
    pub fn to_catalog(&self) -> String {
        self.modlist.iter().map(|m| m.to_catalog_record() + "\n").collect()
    }
}

/// The modules selected for a document, in order; never contains duplicates.
#[derive(Clone,Debug,Default,PartialEq,Eq)]
pub struct LayoutModuleList {
    list:Vec<String>
}

impl Deref for LayoutModuleList {
    type Target = [String];
    fn deref(&self) -> &[String] { &self.list }
}

impl<S:AsRef<str>> FromIterator<S> for LayoutModuleList {
    fn from_iter<T:IntoIterator<Item=S>>(iter:T) -> Self {
        let mut ret = LayoutModuleList::default();
        for s in iter { ret.push(s.as_ref()); }
        ret
    }
}

impl LayoutModuleList {
    /// Appends `module` unless it is already selected.
    pub fn push(&mut self,module:&str) -> bool {
        if self.list.iter().any(|m| m == module) { return false }
        self.list.push(module.to_string());
        true
    }
    pub fn remove(&mut self,module:&str) -> bool {
        let len = self.list.len();
        self.list.retain(|m| m != module);
        len != self.list.len()
    }
    pub fn clear(&mut self) { self.list.clear() }
    pub fn as_slice(&self) -> &[String] { &self.list }

    /** Whether `module` may be added to the selection: it is not selected yet, and, if it
     is registered, neither the class nor a selected module rules it out and one of its
     required modules (if any) is present. Unregistered modules are addable.
    */
    pub fn module_can_be_added(&self,module:&str,lay:&TextClass,registry:&ModuleList) -> bool {
        if self.list.iter().any(|m| m == module) { return false }
        let Some(lm) = registry.get(module) else { return true };
        if lay.excluded_modules().iter().any(|m| m == module) { return false }
        if lay.provided_modules().iter().any(|m| m == module) { return false }
        if lay.provided_modules().iter().chain(self.list.iter()).any(|m| !registry.are_compatible(module,m)) {
            return false
        }
        let reqs = lm.required_modules();
        reqs.is_empty() || reqs.iter().any(|r| self.list.contains(r) || lay.provided_modules().contains(r))
    }

    /// Drops modules the class provides or excludes, and modules incompatible with one the
    /// class provides. Returns whether anything was dropped.
    pub fn remove_bad_modules(&mut self,lay:&TextClass,registry:&ModuleList) -> bool {
        let old = std::mem::take(&mut self.list);
        let mut changed = false;
        for module in old {
            if lay.provided_modules().contains(&module) {
                info!(target:"modules","Module `{}' dropped because provided by document class.",module);
                changed = true;
                continue
            }
            if lay.excluded_modules().contains(&module) {
                info!(target:"modules","Module `{}' dropped because excluded by document class.",module);
                changed = true;
                continue
            }
            if let Some(pm) = lay.provided_modules().iter().find(|pm| !registry.are_compatible(&module,pm)) {
                info!(target:"modules","Module `{}' dropped because it conflicts with provided module `{}'.",module,pm);
                changed = true;
                continue
            }
            self.push(&module);
        }
        changed
    }

    /** Inserts the class's default modules at the front, in declaration order, skipping
     those in `removed` and those that cannot be added. A default module with requirements
     is only inserted if a module it requires precedes it.
    */
    pub fn add_default_modules(&mut self,lay:&TextClass,registry:&ModuleList,removed:&[String]) {
        let mut insertpos = 0;
        for module in lay.default_modules() {
            if removed.contains(module) {
                debug!(target:"modules","Default module `{}' not added because removed by user.",module);
                continue
            }
            if !self.module_can_be_added(module,lay,registry) {
                debug!(target:"modules","Default module `{}' could not be added.",module);
                continue
            }
            if let Some(lm) = registry.get(module) {
                let reqs = lm.required_modules();
                let before = &self.list[..insertpos];
                if !reqs.is_empty() && !reqs.iter().any(|r| before.contains(r) || lay.provided_modules().contains(r)) {
                    debug!(target:"modules","Default module `{}' not added because its requirements come later.",module);
                    continue
                }
            }
            debug!(target:"modules","Default module `{}' added.",module);
            self.list.insert(insertpos,module.clone());
            insertpos += 1;
        }
    }

    /** Rebuilds the selection, dropping every module that conflicts with an earlier one or
     with a module the class provides, and every module none of whose required modules is
     provided by the class or selected earlier. Unregistered modules are kept. Returns
     whether anything was dropped.
    */
    pub fn check_module_consistency(&mut self,lay:&TextClass,registry:&ModuleList) -> bool {
        let old = std::mem::take(&mut self.list);
        let mut changed = false;
        for module in old {
            let Some(lm) = registry.get(&module) else {
                warn!(target:"modules","Can't find module `{}'! Added although unavailable; can't check requirements.",module);
                changed |= !self.push(&module);
                continue
            };
            if let Some(other) = self.list.iter().chain(lay.provided_modules()).find(|o| !registry.are_compatible(&module,o)) {
                info!(target:"modules","Module `{}' dropped because it conflicts with `{}'.",module,other);
                changed = true;
                continue
            }
            let reqs = lm.required_modules();
            if !reqs.is_empty() && !reqs.iter().any(|r| self.list.contains(r) || lay.provided_modules().contains(r)) {
                info!(target:"modules","Module `{}' dropped because requirements not met.",module);
                changed = true;
                continue
            }
            changed |= !self.push(&module);
        }
        changed
    }

    /** Makes the selection consistent with `lay` (a newly chosen base class), adding its
     default modules except those in `removed`. Returns whether modules had to be dropped.
     Running it again on the result changes nothing.
    */
    pub fn adapt_to_base_class(&mut self,lay:&TextClass,registry:&ModuleList,removed:&[String]) -> bool {
        let mut changed = self.remove_bad_modules(lay,registry);
        // settle the user's selection first so the defaults are judged against it
        changed |= self.check_module_consistency(lay,registry);
        self.add_default_modules(lay,registry,removed);
        changed |= self.check_module_consistency(lay,registry);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageList;
    use crate::textclass::{ReadContext, ReadType};

    fn registry() -> ModuleList {
        let mut ml = ModuleList::default();
        ml.read_catalog_str(r#"
"Foo" "foo" "The foo module" "" "" "" "Misc"
"Bar" "bar" "Needs foo" "" "foo" "" "Misc"
"Theorems (AMS)" "theorems-ams" "AMS theorems" "amsthm" "" "theorems-std" "Maths"
"Theorems" "theorems-std" "Standard theorems" "" "" "" "Maths"
"Theorems (AMS-Extended)" "theorems-ams-extended" "More" "" "theorems-ams|theorems-std" "" "Maths" "true"
"Braille" "braille" "Braille" "braille,braille.sty" "" "" "Foreign"
"#);
        ml
    }

    fn class(text:&str) -> TextClass {
        let paths = SearchPaths::default();
        let mut tc = TextClass::new("test");
        assert_eq!(tc.read_str(&format!("Format 60\nProvides stdinsets 1\nStyle Standard\nEnd\n{}",text),
            ReadType::BaseClass,&ReadContext::new(&paths)),crate::textclass::ReturnValues::Ok);
        tc
    }

    #[test]
    fn registry_records() {
        let ml = registry();
        assert_eq!(ml.len(),6);
        assert_eq!(ml.iter().next().unwrap().name(),"Bar");
        let ext = ml.get("theorems-ams-extended").unwrap();
        assert_eq!(ext.required_modules(),&["theorems-ams".to_string(),"theorems-std".to_string()]);
        assert!(ext.is_local());
        assert_eq!(ext.filename(),"theorems-ams-extended.module");
        let braille = ml.get("braille").unwrap();
        assert!(!braille.is_local());
        let pl : PackageList = ["braille"].into_iter().collect();
        assert!(braille.prerequisites().is_empty());
        assert!(braille.is_available(&pl));
        assert!(!ml.get("theorems-ams").unwrap().is_available(&PackageList::default()));
        assert_eq!(ml.get("theorems-ams").unwrap().prerequisites(),&["amsthm".to_string()]);
        let mut again = ModuleList::default();
        again.read_catalog_str(&ml.to_catalog());
        assert_eq!(again.len(),6);
        assert_eq!(again.get("theorems-ams").unwrap().description(),"AMS theorems");
        assert_eq!(again.get("theorems-ams").unwrap().excluded_modules(),&["theorems-std".to_string()]);
    }

    #[test]
    fn compatibility_looks_up_the_first_module_first() {
        let ml = registry();
        assert!(!ml.are_compatible("theorems-ams","theorems-std"));
        assert!(!ml.are_compatible("theorems-std","theorems-ams"));
        assert!(ml.are_compatible("unknown","theorems-std"));
        assert!(ml.are_compatible("unknown","other"));
    }

    #[test]
    fn excluded_module_takes_its_dependents_along() {
        let ml = registry();
        let lay = class("ExcludesModule foo\n");
        let mut sel : LayoutModuleList = ["foo","bar"].into_iter().collect();
        assert!(sel.remove_bad_modules(&lay,&ml));
        assert_eq!(sel.as_slice(),&["bar".to_string()]);
        assert!(sel.check_module_consistency(&lay,&ml));
        assert!(sel.is_empty());

        let mut sel : LayoutModuleList = ["foo","bar"].into_iter().collect();
        assert!(sel.adapt_to_base_class(&lay,&ml,&[]));
        assert!(sel.is_empty());
    }

    #[test]
    fn can_be_added() {
        let ml = registry();
        let lay = class("ProvidesModule theorems-std\nExcludesModule braille\n");
        let sel : LayoutModuleList = ["foo"].into_iter().collect();
        assert!(!sel.module_can_be_added("foo",&lay,&ml));
        assert!(!sel.module_can_be_added("braille",&lay,&ml));
        assert!(!sel.module_can_be_added("theorems-std",&lay,&ml));
        assert!(!sel.module_can_be_added("theorems-ams",&lay,&ml));
        assert!(sel.module_can_be_added("bar",&lay,&ml));
        assert!(sel.module_can_be_added("theorems-ams-extended",&lay,&ml));
        assert!(sel.module_can_be_added("not-registered",&lay,&ml));
        assert!(!LayoutModuleList::default().module_can_be_added("bar",&lay,&ml));
    }

    #[test]
    fn default_modules_go_first_in_order() {
        let ml = registry();
        let lay = class("DefaultModule foo\nDefaultModule bar\nDefaultModule theorems-std\n");
        let mut sel : LayoutModuleList = ["braille"].into_iter().collect();
        assert!(!sel.adapt_to_base_class(&lay,&ml,&[]));
        assert_eq!(sel.as_slice(),&["foo","bar","theorems-std","braille"].map(String::from));
        // user-removed defaults stay out
        let mut sel = LayoutModuleList::default();
        sel.adapt_to_base_class(&lay,&ml,&["foo".to_string()]);
        assert_eq!(sel.as_slice(),&["theorems-std".to_string()]);
        // a default is not added twice
        let mut sel : LayoutModuleList = ["theorems-std"].into_iter().collect();
        sel.add_default_modules(&lay,&ml,&[]);
        assert_eq!(sel.as_slice(),&["foo","bar","theorems-std"].map(String::from));
    }

    #[test]
    fn adapting_twice_changes_nothing() {
        let ml = registry();
        let classes = [
            class("ExcludesModule foo\nDefaultModule theorems-ams\n"),
            class("ProvidesModule theorems-std\nDefaultModule bar\nDefaultModule foo\n"),
            class("DefaultModule theorems-ams-extended\nDefaultModule theorems-std\n"),
            class(""),
        ];
        let selections : [&[&str];5] = [
            &[], &["foo","bar"], &["bar","foo"], &["theorems-std","theorems-ams","unknown","unknown"],
            &["theorems-ams-extended","theorems-ams","braille"],
        ];
        for lay in &classes {
            for sel in selections {
                let mut sel : LayoutModuleList = sel.iter().collect();
                sel.adapt_to_base_class(lay,&ml,&[]);
                let once = sel.clone();
                assert!(!sel.adapt_to_base_class(lay,&ml,&[]),"{:?} changed again",once);
                assert_eq!(sel,once);
                let mut seen = std::collections::BTreeSet::new();
                assert!(sel.iter().all(|m| seen.insert(m.clone())));
            }
        }
    }
}
