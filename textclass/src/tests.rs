#[doc(hidden)]
#[cfg(any(test,doctest))]
#[allow(dead_code)]
pub mod test_utils {
    use std::path::{Path, PathBuf};
    use crate::paths::SearchPaths;

    #[allow(unused_must_use)]
    pub fn trace() {
        env_logger::builder().filter_level(log::LevelFilter::Trace).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn debug() {
        env_logger::builder().filter_level(log::LevelFilter::Debug).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn info() {
        env_logger::builder().filter_level(log::LevelFilter::Info).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn warn() {
        env_logger::builder().filter_level(log::LevelFilter::Warn).is_test(true).try_init();
    }
    #[allow(unused_must_use)]
    pub fn error() {
        env_logger::builder().filter_level(log::LevelFilter::Error).is_test(true).try_init();
    }

    /// A throw-away library root in a temporary directory; removed on drop.
    pub struct LibraryTree {
        dir:tempfile::TempDir
    }
    impl LibraryTree {
        pub fn new() -> Self {
            LibraryTree { dir:tempfile::tempdir().unwrap() }
        }
        /// Writes `content` to `rel` below the root, creating directories as needed.
        pub fn file(self,rel:&str,content:&str) -> Self {
            let p = self.dir.path().join(rel);
            if let Some(parent) = p.parent() { std::fs::create_dir_all(parent).unwrap() }
            std::fs::write(&p,content).unwrap();
            self
        }
        pub fn path(&self) -> PathBuf { self.dir.path().to_path_buf() }
        pub fn join<P:AsRef<Path>>(&self,rel:P) -> PathBuf { self.dir.path().join(rel) }
        /// Search paths consisting of this root only.
        pub fn paths(&self) -> SearchPaths { SearchPaths::new([self.path()]) }
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::test_utils::*;
    use crate::prelude::*;
    use crate::modules::LayoutModuleList;

    const ARTICLE: &str = "#% Do not delete the line below; configure depends on this\n\
        #  \\DeclareLaTeXClass{Article}\n#  \\DeclareCategory{Articles}\n\
        Format 60\nProvides stdinsets 1\nDefaultModule theorems\nDefaultStyle Standard\n\
        Style Standard\n  LatexType Paragraph\n  LatexName dummy\nEnd\n\
        Style Section\n  LatexType Command\n  LatexName section\n  TocLevel 1\n  LabelCounter section\nEnd\n\
        Counter section\nEnd\n";

    const THEOREMS: &str = "#\\DeclareLyXModule{Theorems}\n#DescriptionBegin\n#  Numbered theorems.\n\
        #DescriptionEnd\n#Category: maths\n\nFormat 60\n\
        Style Theorem\n  LatexType Environment\n  LatexName thm\nEnd\n";

    const FOOTNOTES: &str = "#\\DeclareLyXModule{Foot notes}\n#Requires: theorems\n\nFormat 60\n\
        ModifyStyle Standard\n  LatexName footpar\nEnd\n";

    const NATBIB: &str = "# \\DeclareLyXCiteEngine[natbib.sty]{Natbib}\n# DescriptionBegin\n#   Natbib.\n\
        # DescriptionEnd\n# Excludes: basic|jurabib\n\nFormat 60\n\
        CiteEngineType authoryear|numerical\nCiteFramework natbib\n\
        DefaultBiblio authoryear:plainnat|numerical:plainnat\n\
        CiteEngine authoryear\n  Citet*[][]\n  Citep*[][]\nEnd\n\
        CiteEngine numerical\n  Citep*[][]\n  Citet*[][]\nEnd\n";

    fn library() -> LibraryTree {
        LibraryTree::new()
            .file("packages.lst","!!fileformat 2\narticle.cls\nnatbib\n")
            .file("layouts/article.layout",ARTICLE)
            .file("layouts/report.layout","#  \\DeclareLaTeXClass{Report}\nFormat 60\nProvides stdinsets 1\n\
                ExcludesModule theorems\nStyle Standard\nEnd\n")
            .file("layouts/theorems.module",THEOREMS)
            .file("layouts/footnotes.module",FOOTNOTES)
            .file("citeengines/natbib.citeengine",NATBIB)
    }

    #[test]
    fn one_line_class_catalog() {
        info();
        let lib = LibraryTree::new().file("textclass.lst","article\tarticle\t\"Article\"\t1\n");
        let mut cats = Catalogs::new(lib.paths());
        // only the module and engine catalogs are missing
        assert!(!cats.read_all());
        assert_eq!(cats.classes.len(),1);
        assert!(cats.classes.have_class("article"));
        assert_eq!(cats.classes.default_baseclass().as_deref(),Some("article"));
        assert!(cats.classes.get("article").unwrap().is_tex_class_available());
        assert!(cats.modules.is_empty());
    }

    #[test]
    fn reconfigure_and_build_document_class() {
        info();
        let lib = library();
        let mut cats = Catalogs::new(lib.paths());
        assert!(!cats.read_all());
        assert_eq!(cats.packages.len(),2);
        let scan = cats.reconfigure().unwrap();
        assert_eq!(scan.classes.len(),2);
        assert!(lib.join("textclass.lst").is_file());
        assert!(lib.join("lyxmodules.lst").is_file());
        assert!(lib.join("lyxciteengines.lst").is_file());
        assert!(cats.read_all());

        let article = cats.classes.get("article").unwrap();
        assert!(article.is_tex_class_available());
        assert!(!cats.classes.get("report").unwrap().is_tex_class_available());
        assert_eq!(article.category(),"Articles");
        assert_eq!(cats.modules.get("theorems").unwrap().description(),"Numbered theorems.");
        assert_eq!(cats.engines.get("natbib").unwrap().get_default_biblio(CiteEngineType::AUTHORYEAR),"plainnat");

        cats.load_class("article",None).unwrap();
        let lay = cats.classes.get("article").unwrap();
        let mut mods = LayoutModuleList::default();
        assert!(!mods.adapt_to_base_class(lay,&cats.modules,&[]));
        assert_eq!(mods.as_slice(),&["theorems".to_string()]);
        assert!(mods.module_can_be_added("footnotes",lay,&cats.modules));
        mods.push("footnotes");

        let doc = cats.document_class("article",&mods,Some("natbib"),false).unwrap();
        assert!(doc.has_layout("Theorem"));
        assert_eq!(doc.layout("Standard").unwrap().latexname,"footpar");
        assert_eq!(doc.modules(),mods.as_slice());
        assert_eq!(doc.cite_framework,"natbib");
        assert_eq!(doc.cite_styles(CiteEngineType::AUTHORYEAR).iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["citet","citep"]);
        assert_eq!(doc.toc_layout().map(|l| l.name.as_str()),Some("Section"));
        // the catalog's class is untouched
        let base = cats.classes.get("article").unwrap();
        assert!(!base.has_layout("Theorem"));
        assert_eq!(base.layout("Standard").unwrap().latexname,"dummy");

        // switching to a class that excludes theorems takes footnotes along
        cats.load_class("report",None).unwrap();
        let report = cats.classes.get("report").unwrap();
        assert!(mods.adapt_to_base_class(report,&cats.modules,&[]));
        assert!(mods.is_empty());
    }

    #[test]
    fn adapting_is_a_fixpoint_for_installed_classes() {
        let lib = library();
        let mut cats = Catalogs::new(lib.paths());
        cats.read_all();
        cats.reconfigure().unwrap();
        let selections : [&[&str];4] = [&[],&["footnotes"],&["footnotes","theorems"],&["theorems","footnotes","unknown"]];
        for class in ["article","report"] {
            cats.load_class(class,None).unwrap();
            let lay = cats.classes.get(class).unwrap();
            for sel in selections {
                let mut mods : LayoutModuleList = sel.iter().collect();
                mods.adapt_to_base_class(lay,&cats.modules,&[]);
                let once = mods.clone();
                assert!(!mods.adapt_to_base_class(lay,&cats.modules,&[]));
                assert_eq!(mods,once);
            }
        }
    }

    #[test]
    fn catalogs_round_trip() {
        let lib = library();
        let mut cats = Catalogs::new(lib.paths());
        cats.read_all();
        cats.reconfigure().unwrap();
        let mut classes = LayoutFileList::default();
        classes.read_catalog_str(&cats.classes.to_catalog());
        let mut engines = CiteEnginesList::default();
        engines.read_catalog_str(&cats.engines.to_catalog());
        for (name,lf) in cats.classes.iter() {
            let back = classes.get(name).unwrap();
            assert_eq!(back.description(),lf.description());
            assert_eq!(back.is_tex_class_available(),lf.is_tex_class_available());
        }
        let natbib = engines.get("natbib").unwrap();
        assert_eq!(natbib.engine_types(),cats.engines.get("natbib").unwrap().engine_types());
        assert_eq!(natbib.name(),"Natbib");
    }

    #[test]
    fn missing_module_file_is_not_fatal() {
        let lib = library();
        let mut cats = Catalogs::new(lib.paths());
        cats.read_all();
        cats.reconfigure().unwrap();
        std::fs::remove_file(lib.join("layouts/theorems.module")).unwrap();
        let doc = cats.document_class("article",&["theorems".to_string()],None,true).unwrap();
        assert!(!doc.has_layout("Theorem"));
        assert!(doc.has_layout("Standard"));
    }
}
