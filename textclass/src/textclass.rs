/*! The layout file reader and the data it accumulates.

A [`TextClass`] is filled by one or more [`read`](TextClass::read_file)s: the class's own
`.layout` file ([`ReadType::BaseClass`]), files pulled in via `Input` ([`ReadType::Merge`]),
modules ([`ReadType::Module`]) and a cite engine ([`ReadType::CiteEngine`]). Later reads
modify what earlier ones declared.

**Example:**
```rust
use textclass::prelude::*;
let paths = SearchPaths::default();
let ctx = ReadContext::new(&paths);
let mut tc = TextClass::new("example");
let ret = tc.read_str("Format 60\nProvides stdinsets 1\nStyle Standard\n  LatexType Paragraph\nEnd",
    ReadType::BaseClass,&ctx);
assert_eq!(ret,ReturnValues::Ok);
assert_eq!(tc.default_layout_name(),"Standard");
assert!(tc.has_layout("Plain Layout"));
```
*/

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use log::{debug, warn};
use strum::{Display, EnumString};
use crate::LAYOUT_FORMAT;
use crate::citations::{CitationStyle, CiteEngineType};
use crate::counters::{Counter, Counters};
use crate::floats::{FloatList, Floating};
use crate::fonts::FontInfo;
use crate::insetlayout::{InsetLayout, InsetLayouts};
use crate::layout::{Layout, NOT_IN_TOC};
use crate::lexer::{keywords, LexCode, Lexer, Tagged};
use crate::paths::{file_search, SearchPaths};
use crate::upgrade::LayoutUpgrader;
use crate::utils::errors::LayoutError;
use crate::utils::{normalize_name, split_once_or_all, vector_from_string};

/// The name of the style every class has for table cells, notes etc.
pub const PLAIN_LAYOUT: &str = "Plain Layout";

/// What kind of file a read processes; decides which directives are allowed and what
/// happens after the read.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum ReadType {
    /// The class's own `.layout` file.
    BaseClass,
    /// A file included via `Input`.
    Merge,
    Module,
    /// A `.citeengine` file; never overrides cite styles or formats already present.
    CiteEngine,
    /// Syntax check of local layout text.
    Validation
}
impl ReadType {
    fn describe(self) -> &'static str {
        match self {
            ReadType::BaseClass => "textclass",
            ReadType::Merge => "input file",
            ReadType::Module => "module file",
            ReadType::CiteEngine => "cite engine",
            ReadType::Validation => "validation"
        }
    }
}

#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum ReturnValues {
    Ok,
    /// Parsed after converting from an older layout format.
    OkOldFormat,
    /// The text does not start with `Format` [`LAYOUT_FORMAT`].
    FormatMismatch,
    Error
}

/// What a read needs besides the text: where to look for `Input` files and `stdinsets.inc`,
/// and how to convert files in an old format.
#[derive(Clone,Copy)]
pub struct ReadContext<'a> {
    pub paths:&'a SearchPaths,
    pub upgrader:Option<&'a dyn LayoutUpgrader>
}
impl<'a> ReadContext<'a> {
    pub fn new(paths:&'a SearchPaths) -> Self { ReadContext { paths, upgrader:None } }
    pub fn with_upgrader(mut self,upgrader:&'a dyn LayoutUpgrader) -> Self {
        self.upgrader = Some(upgrader);
        self
    }
}

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum OutputType { #[default] Latex, DocBook, Literate }

#[derive(Copy,Clone,Debug,PartialEq,Eq,Default,EnumString,Display)]
#[strum(ascii_case_insensitive,serialize_all="lowercase")]
pub enum TitleLatexType { #[default] CommandAfter, Environment }

keywords! { enum ClassTag in CLASS_TAGS {
    "addtociteengine" => AddToCiteEngine,
    "addtohtmlpreamble" => AddToHtmlPreamble,
    "addtohtmlstyles" => AddToHtmlStyles,
    "addtopreamble" => AddToPreamble,
    "citeengine" => CiteEngine,
    "citeenginetype" => CiteEngineType,
    "citeformat" => CiteFormat,
    "citeframework" => CiteFramework,
    "classoptions" => ClassOptions,
    "columns" => Columns,
    "counter" => Counter,
    "defaultbiblio" => DefaultBiblio,
    "defaultfont" => DefaultFont,
    "defaultmodule" => DefaultModule,
    "defaultstyle" => DefaultStyle,
    "excludesmodule" => ExcludesModule,
    "float" => Float,
    "format" => Format,
    "fullauthorlist" => FullAuthorList,
    "htmlpreamble" => HtmlPreamble,
    "htmlstyles" => HtmlStyles,
    "ifcounter" => IfCounter,
    "input" => Input,
    "insetlayout" => InsetLayout,
    "leftmargin" => LeftMargin,
    "maxcitenames" => MaxCiteNames,
    "modifyinsetlayout" => ModifyInsetLayout,
    "modifystyle" => ModifyStyle,
    "nocounter" => NoCounter,
    "nofloat" => NoFloat,
    "noinsetlayout" => NoInsetLayout,
    "nostyle" => NoStyle,
    "outlinername" => OutlinerName,
    "outputformat" => OutputFormat,
    "outputtype" => OutputType,
    "packageoptions" => PackageOptions,
    "pagestyle" => PageStyle,
    "preamble" => Preamble,
    "provideinsetlayout" => ProvideInsetLayout,
    "provides" => Provides,
    "providesmodule" => ProvidesModule,
    "providestyle" => ProvideStyle,
    "requires" => Requires,
    "rightmargin" => RightMargin,
    "secnumdepth" => SecNumDepth,
    "sides" => Sides,
    "style" => Style,
    "tablestyle" => TableStyle,
    "titlelatexname" => TitleLatexName,
    "titlelatextype" => TitleLatexType,
    "tocdepth" => TocDepth,
}}

keywords! { enum OptionTag in OPTION_TAGS {
    "end" => End, "fontsize" => FontSize, "other" => Other, "pagesize" => PageSize, "pagestyle" => PageStyle
}}

/// Style bodies are matched against this: `Style` modifies or creates, `ProvideStyle` only
/// creates, `ModifyStyle` only modifies.
#[derive(Copy,Clone,PartialEq,Eq)]
enum BlockMode { Any, Provide, Modify }

/// Everything a class, its included files and its modules declare.
#[derive(Clone,Debug)]
pub struct TextClass {
    pub(crate) name:String,
    pub(crate) latexname:String,
    pub(crate) description:String,
    pub(crate) prerequisites:String,
    pub(crate) category:String,
    pub(crate) loaded:bool,
    /// Files currently being read, outermost first.
    reading:Vec<PathBuf>,

    layouts:Vec<Layout>,
    inset_layouts:InsetLayouts,
    counters:Counters,
    floats:FloatList,
    defaultlayout:String,
    defaultfont:FontInfo,

    default_modules:Vec<String>,
    provided_modules:Vec<String>,
    excluded_modules:Vec<String>,
    provides:BTreeSet<String>,
    requires:BTreeSet<String>,
    package_options:BTreeMap<String,String>,

    pub outputtype:OutputType,
    pub outputformat:String,
    pub columns:i32,
    pub sides:u8,
    pub pagestyle:String,
    pub secnumdepth:i32,
    pub tocdepth:i32,
    pub opt_fontsize:String,
    pub opt_pagesize:String,
    pub opt_pagestyle:String,
    pub options:String,
    pub leftmargin:String,
    pub rightmargin:String,
    pub titletype:TitleLatexType,
    pub titlename:String,
    pub preamble:String,
    pub htmlpreamble:String,
    pub htmlstyles:String,
    pub tablestyle:String,
    outliner_names:BTreeMap<String,String>,

    cite_styles:BTreeMap<CiteEngineType,Vec<CitationStyle>>,
    class_cite_styles:BTreeMap<CiteEngineType,Vec<CitationStyle>>,
    cite_command_aliases:BTreeMap<String,String>,
    cite_formats:BTreeMap<CiteEngineType,BTreeMap<String,String>>,
    cite_macros:BTreeMap<CiteEngineType,BTreeMap<String,String>>,
    cite_default_biblio:BTreeMap<String,String>,
    pub opt_enginetype:String,
    pub cite_framework:String,
    pub maxcitenames:usize,
    pub cite_full_author_list:bool,

    min_toclevel:i32,
    max_toclevel:i32
}

impl TextClass {
    /// An empty class named `name` (the `.layout` file's stem).
    pub fn new(name:&str) -> Self {
        TextClass {
            name:name.to_string(), latexname:name.to_string(), description:String::new(),
            prerequisites:String::new(), category:String::new(), loaded:false, reading:Vec::new(),
            layouts:Vec::new(), inset_layouts:InsetLayouts::new(), counters:Counters::default(),
            floats:FloatList::default(), defaultlayout:String::new(), defaultfont:FontInfo::sane(),
            default_modules:Vec::new(), provided_modules:Vec::new(), excluded_modules:Vec::new(),
            provides:BTreeSet::new(), requires:BTreeSet::new(), package_options:BTreeMap::new(),
            outputtype:OutputType::Latex, outputformat:"latex".to_string(), columns:1, sides:1,
            pagestyle:"default".to_string(), secnumdepth:3, tocdepth:3,
            opt_fontsize:"10|11|12".to_string(), opt_pagesize:"default|a4|a5|b5|letter|legal|executive".to_string(),
            opt_pagestyle:"empty|plain|headings|fancy".to_string(), options:String::new(),
            leftmargin:String::new(), rightmargin:String::new(),
            titletype:TitleLatexType::CommandAfter, titlename:"maketitle".to_string(),
            preamble:String::new(), htmlpreamble:String::new(), htmlstyles:String::new(),
            tablestyle:"default".to_string(), outliner_names:BTreeMap::new(),
            cite_styles:BTreeMap::new(), class_cite_styles:BTreeMap::new(),
            cite_command_aliases:BTreeMap::new(), cite_formats:BTreeMap::new(),
            cite_macros:BTreeMap::new(), cite_default_biblio:BTreeMap::new(),
            opt_enginetype:"authoryear|numerical".to_string(), cite_framework:String::new(),
            maxcitenames:2, cite_full_author_list:true,
            min_toclevel:NOT_IN_TOC, max_toclevel:NOT_IN_TOC
        }
    }

    // ---- accessors -------------------------------------------------------------------------

    /// The file stem identifying the class, e.g. `article`.
    pub fn name(&self) -> &str { &self.name }
    /// The LaTeX class this layout is for, e.g. `article` for `article.layout`.
    pub fn latexname(&self) -> &str { &self.latexname }
    pub fn description(&self) -> &str { &self.description }
    pub fn prerequisites(&self) -> &str { &self.prerequisites }
    pub fn category(&self) -> &str { &self.category }
    /// Whether the class body has been read; see [`LayoutFile::load`](crate::layoutfile::LayoutFile::load).
    pub fn loaded(&self) -> bool { self.loaded }

    pub fn layouts(&self) -> &[Layout] { &self.layouts }
    pub fn has_layout(&self,name:&str) -> bool { self.layouts.iter().any(|l| l.name == name) }
    pub fn layout(&self,name:&str) -> Option<&Layout> { self.layouts.iter().find(|l| l.name == name) }
    pub fn layout_mut(&mut self,name:&str) -> Option<&mut Layout> { self.layouts.iter_mut().find(|l| l.name == name) }
    pub fn default_layout_name(&self) -> &str { &self.defaultlayout }
    pub fn default_layout(&self) -> Option<&Layout> { self.layout(&self.defaultlayout) }
    pub fn plain_layout(&self) -> Option<&Layout> { self.layout(PLAIN_LAYOUT) }
    pub fn inset_layouts(&self) -> &InsetLayouts { &self.inset_layouts }
    pub fn has_inset_layout(&self,name:&str) -> bool { self.inset_layouts.contains_key(name) }
    pub fn counters(&self) -> &Counters { &self.counters }
    pub fn floats(&self) -> &FloatList { &self.floats }
    pub fn default_font(&self) -> &FontInfo { &self.defaultfont }
    pub fn default_modules(&self) -> &[String] { &self.default_modules }
    pub fn provided_modules(&self) -> &[String] { &self.provided_modules }
    pub fn excluded_modules(&self) -> &[String] { &self.excluded_modules }
    /// Features the class itself takes care of (`Provides <feature> 1`).
    pub fn provides(&self,feature:&str) -> bool { self.provides.contains(feature) }
    pub fn requires(&self) -> &BTreeSet<String> { &self.requires }
    pub fn package_options(&self) -> &BTreeMap<String,String> { &self.package_options }
    pub fn outliner_names(&self) -> &BTreeMap<String,String> { &self.outliner_names }
    pub fn min_toclevel(&self) -> i32 { self.min_toclevel }
    pub fn max_toclevel(&self) -> i32 { self.max_toclevel }
    pub fn has_toc_levels(&self) -> bool { self.min_toclevel != NOT_IN_TOC }

    /// The cite styles for an engine type; for a combined type, those of its first bucket.
    pub fn cite_styles(&self,t:CiteEngineType) -> &[CitationStyle] {
        t.buckets().next().and_then(|b| self.cite_styles.get(&b)).map_or(&[],Vec::as_slice)
    }
    /// Alias → LyX name of the cite command it stands for.
    pub fn cite_command_aliases(&self) -> &BTreeMap<String,String> { &self.cite_command_aliases }
    pub fn cite_format(&self,t:CiteEngineType,key:&str) -> Option<&str> {
        t.buckets().find_map(|b| self.cite_formats.get(&b)?.get(key)).map(String::as_str)
    }
    pub fn cite_macro(&self,t:CiteEngineType,key:&str) -> Option<&str> {
        t.buckets().find_map(|b| self.cite_macros.get(&b)?.get(key)).map(String::as_str)
    }
    /// Default bibliography style per engine type name (`authoryear`, `numerical`).
    pub fn cite_default_biblio(&self) -> &BTreeMap<String,String> { &self.cite_default_biblio }

    /// Removes a style; the default style and the plain layout cannot be removed.
    pub fn delete_layout(&mut self,name:&str) -> bool {
        if name == self.defaultlayout || name == PLAIN_LAYOUT { return false }
        let len = self.layouts.len();
        self.layouts.retain(|l| l.name != name);
        len != self.layouts.len()
    }
    pub fn delete_inset_layout(&mut self,name:&str) -> bool {
        self.inset_layouts.remove(name).is_some()
    }

    // ---- reading ---------------------------------------------------------------------------

    /// Reads the class's layout file. Looks at `path` first (a file, or a directory that
    /// contains `<name>.layout`), then in the `layouts` directories of the search paths.
    /// Once a load succeeded, further calls do nothing.
    pub fn load(&mut self,path:Option<&Path>,ctx:&ReadContext) -> Result<(),LayoutError> {
        if self.loaded { return Ok(()) }
        let file = path.and_then(|p| {
            if p.is_file() { Some(p.to_path_buf()) }
            else { file_search(p,&format!("{}.layout",self.name),"") }
        }).or_else(|| ctx.paths.lib_file_search("layouts",&self.name,"layout"))
            .ok_or_else(|| LayoutError::UnknownClass(self.name.clone()))?;
        match self.read_file(&file,ReadType::BaseClass,ctx) {
            Ok(()) => { self.loaded = true; Ok(()) }
            Err(e) => {
                log::error!(target:"tclass","Error reading `{}' (check `{}'); check your installation \
                    and try reconfiguring",file.display(),self.name);
                Err(e)
            }
        }
    }

    /** Reads `file` into this class. On a format mismatch, the file is converted with the
     context's [`LayoutUpgrader`] and the converted text is read instead.
    */
    pub fn read_file(&mut self,file:&Path,rt:ReadType,ctx:&ReadContext) -> Result<(),LayoutError> {
        if !file.is_file() {
            return Err(LayoutError::io(file,std::io::Error::new(std::io::ErrorKind::NotFound,"not a readable file")))
        }
        debug!(target:"tclass","Reading {}: {}",rt.describe(),file.display());
        if rt == ReadType::BaseClass { self.ensure_plain_layout() }
        self.reading.push(canonical(file));
        let ret = self.read_file_body(file,rt,ctx);
        self.reading.pop();
        debug!(target:"tclass","Finished reading {}: {}",rt.describe(),file.display());
        ret
    }

    fn read_file_body(&mut self,file:&Path,rt:ReadType,ctx:&ReadContext) -> Result<(),LayoutError> {
        let mut lex = Lexer::with_table(&CLASS_TAGS);
        lex.set_file(file)?;
        let ret = self.read(&mut lex,rt,ctx,file.parent());
        match ret {
            ReturnValues::Ok | ReturnValues::OkOldFormat => Ok(()),
            ReturnValues::Error => Err(LayoutError::Parse(file.display().to_string())),
            ReturnValues::FormatMismatch => {
                debug!(target:"tclass","Converting layout file {} to format {}",file.display(),LAYOUT_FORMAT);
                let converted = ctx.upgrader.and_then(|u| u.upgrade_file(file))
                    .ok_or_else(|| LayoutError::Conversion(file.display().to_string()))?;
                let mut lex = Lexer::with_table(&CLASS_TAGS);
                lex.set_string(&file.display().to_string(),&converted);
                match self.read(&mut lex,rt,ctx,file.parent()) {
                    ReturnValues::Ok => Ok(()),
                    ReturnValues::FormatMismatch => Err(LayoutError::Conversion(file.display().to_string())),
                    _ => Err(LayoutError::Parse(file.display().to_string()))
                }
            }
        }
    }

    /// Reads layout text (e.g. a document's local layout). Text in an older format is
    /// converted first, giving [`ReturnValues::OkOldFormat`] on success.
    pub fn read_str(&mut self,text:&str,rt:ReadType,ctx:&ReadContext) -> ReturnValues {
        if rt == ReadType::BaseClass { self.ensure_plain_layout() }
        let mut lex = Lexer::with_table(&CLASS_TAGS);
        lex.set_string("<string>",text);
        let ret = self.read(&mut lex,rt,ctx,None);
        if ret != ReturnValues::FormatMismatch { return ret }
        let Some(converted) = ctx.upgrader.and_then(|u| u.upgrade(text)) else {
            warn!(target:"tclass","Unable to convert layout text to format {}",LAYOUT_FORMAT);
            return ReturnValues::Error
        };
        lex.set_string("<converted string>",&converted);
        match self.read(&mut lex,rt,ctx,None) {
            ReturnValues::Ok => ReturnValues::OkOldFormat,
            _ => ReturnValues::Error
        }
    }

    /// Checks `text` by reading it into a throw-away class.
    pub fn validate(text:&str,ctx:&ReadContext) -> ReturnValues {
        TextClass::new("validation").read_str(text,ReadType::Validation,ctx)
    }

    fn ensure_plain_layout(&mut self) {
        if !self.has_layout(PLAIN_LAYOUT) {
            let plain = self.create_basic_layout(PLAIN_LAYOUT);
            self.layouts.push(plain);
        }
    }

    /// A plain paragraph style called `name`.
    pub fn create_basic_layout(&self,name:&str) -> Layout {
        const BASIC: &str = "Margin Static\nLatexType Paragraph\nLatexName dummy\nAlign Block\n\
            AlignPossible Left, Right, Center\nLabelType No_Label\nEnd";
        let mut lex = Lexer::from_str("<basic layout>",BASIC);
        let mut lay = Layout::new(name);
        self.read_style(&mut lex,&mut lay);
        lay
    }

    fn read_style(&self,lex:&mut Lexer,lay:&mut Layout) -> bool {
        if !lay.read(lex,self) { return false }
        lay.resfont = lay.font.clone();
        lay.resfont.realize(&self.defaultfont);
        lay.reslabelfont = lay.labelfont.clone();
        lay.reslabelfont.realize(&self.defaultfont);
        true
    }

    /// The main loop; `dir` is the directory of the file being read, for relative `Input`s.
    fn read(&mut self,lex:&mut Lexer,rt:ReadType,ctx:&ReadContext,dir:Option<&Path>) -> ReturnValues {
        if !lex.is_ok() { return ReturnValues::Error }
        if lex.lex_tag::<ClassTag>() != Tagged::Tag(ClassTag::Format) || !lex.next(false)
            || lex.get_integer() != LAYOUT_FORMAT {
            return ReturnValues::FormatMismatch
        }
        let mut error = false;
        while !error {
            let tag = match lex.lex_tag::<ClassTag>() {
                Tagged::Eof => break,
                Tagged::Unknown if lex.status() == LexCode::Undef => {
                    lex.print_error("Unknown TextClass tag `$$Token'");
                    error = true;
                    continue
                }
                Tagged::Unknown => {
                    debug!(target:"tclass","Ignoring stray data `{}'",lex.get_string());
                    continue
                }
                Tagged::Tag(t) => t
            };
            error = !self.read_tag(tag,lex,rt,ctx,dir);
        }
        if error { return ReturnValues::Error }
        if rt != ReadType::BaseClass { return ReturnValues::Ok }

        if self.defaultlayout.is_empty() {
            log::error!(target:"tclass","Textclass `{}' is missing a default style",self.name);
            return ReturnValues::Error
        }
        if !self.has_layout(&self.defaultlayout) {
            log::error!(target:"tclass","Default style `{}' of textclass `{}' is not defined",self.defaultlayout,self.name);
            return ReturnValues::Error
        }
        // `Provides stdinsets 1` means the standard insets are defined already
        if !self.provides.remove("stdinsets") {
            match ctx.paths.lib_file_search("layouts","stdinsets.inc","") {
                None => warn!(target:"tclass","Could not find stdinsets.inc! This may lead to data loss!"),
                Some(f) => if let Err(e) = self.read_file(&f,ReadType::Merge,ctx) {
                    warn!(target:"tclass","Could not read stdinsets.inc ({}). This may lead to data loss!",e)
                }
            }
        }
        self.min_toclevel = NOT_IN_TOC;
        self.max_toclevel = NOT_IN_TOC;
        for lay in &self.layouts {
            if lay.toclevel == NOT_IN_TOC { continue }
            if self.min_toclevel == NOT_IN_TOC {
                self.min_toclevel = lay.toclevel;
                self.max_toclevel = lay.toclevel;
            } else {
                self.min_toclevel = self.min_toclevel.min(lay.toclevel);
                self.max_toclevel = self.max_toclevel.max(lay.toclevel);
            }
        }
        ReturnValues::Ok
    }

    /// Handles one directive; returns `false` on a fatal error.
    fn read_tag(&mut self,tag:ClassTag,lex:&mut Lexer,rt:ReadType,ctx:&ReadContext,dir:Option<&Path>) -> bool {
        match tag {
            ClassTag::Format => {
                lex.next(false);
                lex.print_error("Duplicate Format directive");
            }
            ClassTag::OutputFormat => if lex.next(false) { self.outputformat = lex.get_string().to_string() },
            ClassTag::OutputType => if lex.next(false) && lex.parse_into(&mut self.outputtype,"output type") {
                self.outputformat = self.outputtype.to_string();
            },
            ClassTag::Input => if lex.next(false) { return self.read_input(lex,ctx,dir) },
            ClassTag::DefaultStyle => if lex.next(false) { self.defaultlayout = normalize_name(lex.get_string()) },
            ClassTag::Style => return self.read_style_block(lex,BlockMode::Any),
            ClassTag::ProvideStyle => return self.read_style_block(lex,BlockMode::Provide),
            ClassTag::ModifyStyle => return self.read_style_block(lex,BlockMode::Modify),
            ClassTag::NoStyle => if lex.next(false) {
                let style = normalize_name(lex.get_string());
                if !self.delete_layout(&style) {
                    warn!(target:"tclass","Cannot delete style `{}'",style)
                }
            },
            ClassTag::InsetLayout => return self.read_inset_block(lex,BlockMode::Any),
            ClassTag::ProvideInsetLayout => return self.read_inset_block(lex,BlockMode::Provide),
            ClassTag::ModifyInsetLayout => return self.read_inset_block(lex,BlockMode::Modify),
            ClassTag::NoInsetLayout => if lex.next(false) {
                let style = normalize_name(lex.get_string());
                if !self.delete_inset_layout(&style) {
                    warn!(target:"tclass","InsetLayout `{}' cannot be removed because it was not found!",style)
                }
            },
            ClassTag::Columns => if lex.next(false) { self.columns = lex.get_integer() },
            ClassTag::Sides => if lex.next(false) {
                self.sides = match lex.get_integer() {
                    2 => 2,
                    1 => 1,
                    _ => {
                        warn!(target:"tclass","Impossible number of page sides, setting to one.");
                        1
                    }
                }
            },
            ClassTag::PageStyle => if lex.next(false) { self.pagestyle = lex.get_string().trim_end().to_string() },
            ClassTag::DefaultFont => {
                let (mut f,ok) = FontInfo::read(lex,FontInfo::default());
                if !f.resolved() {
                    lex.print_error("Warning: defaultfont should be fully instantiated!");
                    f.realize(&FontInfo::sane());
                }
                self.defaultfont = f;
                if !ok { return false }
            }
            ClassTag::SecNumDepth => if lex.next(false) { self.secnumdepth = lex.get_integer() },
            ClassTag::TocDepth => if lex.next(false) { self.tocdepth = lex.get_integer() },
            ClassTag::ClassOptions => self.read_class_options(lex),
            ClassTag::Preamble => self.preamble = lex.get_long_string("EndPreamble"),
            ClassTag::AddToPreamble => self.preamble.push_str(&lex.get_long_string("EndPreamble")),
            ClassTag::HtmlPreamble => self.htmlpreamble = lex.get_long_string("EndPreamble"),
            ClassTag::AddToHtmlPreamble => self.htmlpreamble.push_str(&lex.get_long_string("EndPreamble")),
            ClassTag::HtmlStyles => self.htmlstyles = lex.get_long_string("EndStyles"),
            ClassTag::AddToHtmlStyles => self.htmlstyles.push_str(&lex.get_long_string("EndStyles")),
            ClassTag::Provides => {
                lex.next(false);
                let feature = lex.get_string().to_string();
                lex.next(false);
                if lex.get_integer() > 0 { self.provides.insert(feature); }
                else { self.provides.remove(&feature); }
            }
            ClassTag::Requires => if lex.eat_line() {
                self.requires.extend(vector_from_string(lex.get_string(),','))
            },
            ClassTag::PackageOptions => {
                lex.next(false);
                let pkg = lex.get_string().to_string();
                lex.next(false);
                self.package_options.insert(pkg,lex.get_string().to_string());
            }
            ClassTag::DefaultModule => if lex.next(false) {
                push_unique(&mut self.default_modules,lex.get_string())
            },
            ClassTag::ProvidesModule => if lex.next(false) {
                push_unique(&mut self.provided_modules,lex.get_string())
            },
            ClassTag::ExcludesModule => if lex.next(false) {
                // modules have their own way to exclude each other
                if rt == ReadType::Module {
                    warn!(target:"tclass","ExcludesModule tag cannot be used in a module!");
                } else {
                    push_unique(&mut self.excluded_modules,lex.get_string())
                }
            },
            ClassTag::LeftMargin => if lex.next(false) { self.leftmargin = lex.get_doc_string() },
            ClassTag::RightMargin => if lex.next(false) { self.rightmargin = lex.get_doc_string() },
            ClassTag::Float => return self.read_float(lex),
            ClassTag::CiteEngine => return self.read_cite_engine(lex,rt,false),
            ClassTag::AddToCiteEngine => return self.read_cite_engine(lex,rt,true),
            ClassTag::CiteEngineType => if lex.next(false) {
                self.opt_enginetype = lex.get_string().trim_end().to_string()
            },
            ClassTag::CiteFormat => return self.read_cite_format(lex,rt),
            ClassTag::CiteFramework => if lex.next(false) {
                self.cite_framework = lex.get_string().trim_end().to_string()
            },
            ClassTag::MaxCiteNames => if lex.next(false) {
                self.maxcitenames = usize::try_from(lex.get_integer()).unwrap_or(0)
            },
            ClassTag::DefaultBiblio => if lex.next(false) {
                for db in vector_from_string(lex.get_string(),'|') {
                    if db.contains(':') {
                        let (engine,style) = split_once_or_all(&db,':');
                        self.cite_default_biblio.insert(engine.to_string(),style.to_string());
                    } else {
                        for t in vector_from_string(&self.opt_enginetype,'|') {
                            self.cite_default_biblio.insert(t,db.clone());
                        }
                    }
                }
            },
            ClassTag::FullAuthorList => if lex.next(false) {
                self.cite_full_author_list &= lex.get_bool()
            },
            ClassTag::NoCounter => if lex.next(false) {
                let c = lex.get_doc_string();
                if !self.counters.remove(&c) {
                    warn!(target:"tclass","Unable to remove counter: {}",c)
                }
            },
            ClassTag::Counter | ClassTag::IfCounter => {
                if !lex.next(false) {
                    lex.print_error("No name given for counter: `$$Token'.");
                    return false
                }
                let name = lex.get_doc_string();
                if name.is_empty() {
                    lex.print_error("Could not read name for counter: `$$Token'");
                    // discard the body
                    Counter::default().read(lex);
                } else {
                    return self.counters.read(lex,&name,tag == ClassTag::Counter)
                }
            }
            ClassTag::TitleLatexType => if lex.next(false) {
                lex.parse_into(&mut self.titletype,"title type");
            },
            ClassTag::TitleLatexName => if lex.next(false) { self.titlename = lex.get_string().to_string() },
            ClassTag::NoFloat => if lex.next(false) {
                let t = lex.get_string().to_string();
                self.floats.erase(&t);
            },
            ClassTag::OutlinerName => {
                if !lex.next(false) { return false }
                let t = lex.get_string().to_string();
                if !lex.next(false) { return false }
                self.outliner_names.insert(t,lex.get_doc_string());
            }
            ClassTag::TableStyle => if lex.next(false) { self.tablestyle = lex.get_string().trim_end().to_string() }
        }
        true
    }

    fn read_input(&mut self,lex:&mut Lexer,ctx:&ReadContext,dir:Option<&Path>) -> bool {
        let inc = lex.get_string().to_string();
        let file = match dir {
            Some(d) if inc.starts_with("./") || inc.starts_with("../") => file_search(d,&inc,"layout"),
            _ => ctx.paths.lib_file_search("layouts",&inc,"layout")
        };
        let Some(file) = file else {
            lex.print_error(&LayoutError::MissingInput(inc).to_string());
            return false
        };
        if self.reading.contains(&canonical(&file)) {
            lex.print_error(&format!("Input cycle: {} is already being read",file.display()));
            return false
        }
        if let Err(e) = self.read_file(&file,ReadType::Merge,ctx) {
            lex.print_error(&format!("Error reading input file {}: {}",file.display(),e));
            return false
        }
        true
    }

    fn read_style_block(&mut self,lex:&mut Lexer,mode:BlockMode) -> bool {
        if !lex.next(false) {
            lex.print_error("No name given for style: `$$Token'.");
            return false
        }
        let name = normalize_name(lex.get_string());
        if name.is_empty() {
            lex.print_error("Could not read name for style: `$$Token'");
            // consume the body
            return self.read_style(lex,&mut Layout::new(""))
        }
        match self.layouts.iter().position(|l| l.name == name) {
            Some(i) if mode != BlockMode::Provide => {
                let mut lay = self.layouts[i].clone();
                let ok = self.read_style(lex,&mut lay);
                self.layouts[i] = lay;
                ok
            }
            None if mode != BlockMode::Modify => {
                let mut lay = Layout::new(&name);
                let ok = self.read_style(lex,&mut lay);
                if ok { self.layouts.push(lay) }
                if self.defaultlayout.is_empty() { self.defaultlayout = name }
                ok
            }
            _ => {
                // ProvideStyle of an existing or ModifyStyle of a missing style
                self.read_style(lex,&mut Layout::new(&name));
                true
            }
        }
    }

    fn read_inset_block(&mut self,lex:&mut Lexer,mode:BlockMode) -> bool {
        if !lex.next(false) {
            lex.print_error("No name given for InsetLayout: `$$Token'.");
            return false
        }
        let name = normalize_name(lex.get_doc_string().as_str());
        if name.is_empty() {
            lex.print_error("Could not read name for InsetLayout: `$$Token'");
            return InsetLayout::new("").read(lex,self)
        }
        match self.inset_layouts.get(&name) {
            Some(existing) if mode != BlockMode::Provide => {
                let mut il = existing.clone();
                let ok = il.read(lex,self);
                self.inset_layouts.insert(name,il);
                ok
            }
            None if mode != BlockMode::Modify => {
                let mut il = InsetLayout::new(&name);
                let ok = il.read(lex,self);
                if ok { self.inset_layouts.insert(name,il); }
                ok
            }
            _ => {
                InsetLayout::new(&name).read(lex,self);
                true
            }
        }
    }

    fn read_class_options(&mut self,lex:&mut Lexer) {
        let mut lex = lex.scoped_table(&OPTION_TAGS);
        loop {
            let tag = match lex.lex_tag::<OptionTag>() {
                Tagged::Eof => return,
                Tagged::Unknown => {
                    lex.print_error("Unknown ClassOption tag `$$Token'");
                    continue
                }
                Tagged::Tag(OptionTag::End) => return,
                Tagged::Tag(t) => t
            };
            if !lex.next(false) { return }
            let value = lex.get_string().trim_end().to_string();
            match tag {
                OptionTag::FontSize => self.opt_fontsize = value,
                OptionTag::PageSize => self.opt_pagesize = value,
                OptionTag::PageStyle => self.opt_pagestyle = value,
                OptionTag::Other => {
                    if !self.options.is_empty() { self.options.push(',') }
                    self.options.push_str(&value)
                }
                OptionTag::End => ()
            }
        }
    }

    fn read_float(&mut self,lex:&mut Lexer) -> bool {
        let Some(fl) = Floating::read(lex,&self.floats) else { return false };
        let (ftype,within,name) = (fl.floattype.clone(),fl.within.clone(),fl.name.clone());
        self.floats.new_float(fl);
        // each float has its own counter, and one for its sub-floats
        self.counters.new_counter(&ftype,&within,"","",&format!("{} (Float)",name));
        let sub = format!("sub-{}",ftype);
        self.counters.new_counter(&sub,&ftype,&format!("\\alph{{{}}}",sub),"",&format!("Sub-{} (Float)",name));
        true
    }

    fn read_cite_engine(&mut self,lex:&mut Lexer,rt:ReadType,add:bool) -> bool {
        let etype = CiteEngineType::read(lex);
        let mut targets : Vec<CiteEngineType> = etype.buckets().collect();
        if rt == ReadType::CiteEngine {
            // engines never override styles of the class or a module
            targets.retain(|b| self.cite_styles(*b).is_empty());
        } else if !add {
            for b in &targets { self.cite_styles.remove(b); }
        }
        let mut ended = false;
        while lex.eat_line() {
            let def : String = lex.get_string().chars().filter(|c| *c != ' ' && *c != '\t').collect();
            if def.eq_ignore_ascii_case("end") {
                ended = true;
                break
            }
            if def.is_empty() || def.starts_with('#') { continue }
            let (cs,aliases) = CitationStyle::parse(&def);
            for a in aliases { self.cite_command_aliases.insert(a,cs.name.clone()); }
            let dest = if add { &mut self.class_cite_styles } else { &mut self.cite_styles };
            for b in &targets { dest.entry(*b).or_default().push(cs.clone()) }
        }
        // AddToCiteEngine styles wait until the type has styles to add to
        for b in etype.buckets() {
            if add && self.cite_styles(b).is_empty() { continue }
            let Some(pending) = self.class_cite_styles.remove(&b) else { continue };
            let styles = self.cite_styles.entry(b).or_default();
            for cs in pending {
                if !styles.iter().any(|s| s.name == cs.name) { styles.push(cs) }
            }
        }
        if !ended { lex.print_error("CiteEngine is not terminated by End") }
        ended
    }

    fn read_cite_format(&mut self,lex:&mut Lexer,rt:ReadType) -> bool {
        let etype = CiteEngineType::read(lex);
        // engines never override definitions of the class or a module
        let overwrite = rt != ReadType::CiteEngine;
        loop {
            if !lex.next(false) {
                lex.print_error("CiteFormat is not terminated by End");
                return false
            }
            let key = lex.get_string().to_string();
            if key.eq_ignore_ascii_case("end") { return true }
            if !lex.eat_line() { return false }
            let definition = lex.get_string().trim().to_string();
            let table = if key.starts_with('!') || key.starts_with('_') || key.starts_with("B_") {
                &mut self.cite_macros
            } else {
                &mut self.cite_formats
            };
            let defined = etype.buckets().any(|b| table.get(&b).is_some_and(|m| m.contains_key(&key)));
            if overwrite || !defined {
                for b in etype.buckets() {
                    table.entry(b).or_default().insert(key.clone(),definition.clone());
                }
            }
        }
    }
}

fn canonical(file:&Path) -> PathBuf {
    file.canonicalize().unwrap_or_else(|_| file.to_path_buf())
}

fn push_unique(v:&mut Vec<String>,s:&str) {
    if !v.iter().any(|x| x == s) { v.push(s.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::*;

    fn read(text:&str,rt:ReadType) -> (TextClass,ReturnValues) {
        let paths = SearchPaths::default();
        let mut tc = TextClass::new("test");
        let ret = tc.read_str(text,rt,&ReadContext::new(&paths));
        (tc,ret)
    }

    const MINIMAL: &str = "Format 60\nDefaultStyle Standard\nProvides stdinsets 1\n\
        Style Standard\n  LatexType Paragraph\nEnd\n";

    #[test]
    fn minimal_class() {
        let (tc,ret) = read(MINIMAL,ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        assert_eq!(tc.default_layout_name(),"Standard");
        assert!(tc.has_layout(tc.default_layout_name()));
        assert_eq!(tc.layouts()[0].name,PLAIN_LAYOUT);
        assert!(!tc.provides("stdinsets"));
        assert!(!tc.has_toc_levels());
    }

    fn read_raw(text:&str,rt:ReadType) -> ReturnValues {
        let paths = SearchPaths::default();
        let mut lex = Lexer::with_table(&CLASS_TAGS);
        lex.set_string("<raw>",text);
        TextClass::new("raw").read(&mut lex,rt,&ReadContext::new(&paths),None)
    }

    #[test]
    fn format_is_checked_first() {
        assert_eq!(read_raw("Style Standard\nEnd",ReadType::BaseClass),ReturnValues::FormatMismatch);
        assert_eq!(read_raw("Format 49\nStyle Standard\nEnd",ReadType::BaseClass),ReturnValues::FormatMismatch);
        assert_eq!(read_raw("",ReadType::Module),ReturnValues::FormatMismatch);
        // without an upgrader there is nothing to retry with
        assert_eq!(read("Style Standard\nEnd",ReadType::BaseClass).1,ReturnValues::Error);
        assert_eq!(read("Format 49\nStyle Standard\nEnd",ReadType::BaseClass).1,ReturnValues::Error);
        assert_eq!(read("",ReadType::Module).1,ReturnValues::Error);
        // a second Format directive is only reported
        assert_eq!(read("Format 60\nFormat 61\n",ReadType::Module).1,ReturnValues::Ok);
    }

    #[test]
    fn old_files_need_an_upgrader() {
        let lib = LibraryTree::new().file("layouts/old.layout","Format 49\nStyle Standard\nEnd\n");
        let paths = lib.paths();
        let mut tc = TextClass::new("old");
        assert!(matches!(tc.read_file(&lib.join("layouts/old.layout"),ReadType::BaseClass,&ReadContext::new(&paths)),
            Err(LayoutError::Conversion(_))));
    }

    #[test]
    fn unknown_tags_and_missing_default() {
        assert_eq!(read("Format 60\nStile Standard\n",ReadType::Module).1,ReturnValues::Error);
        assert_eq!(read("Format 60\nProvides stdinsets 1\n",ReadType::BaseClass).1,ReturnValues::Error);
        assert_eq!(TextClass::validate("Format 60\nStyle Foo\nEnd",&ReadContext::new(&SearchPaths::default())),ReturnValues::Ok);
    }

    #[test]
    fn default_style_must_exist() {
        let (tc,ret) = read("Format 60\nProvides stdinsets 1\nDefaultStyle Missing\nStyle Standard\nEnd\n",ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Error);
        assert!(!tc.has_layout(tc.default_layout_name()));
        let (tc,ret) = read("Format 60\nProvides stdinsets 1\nStyle Standard\nEnd\nDefaultStyle Standard\n",ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        assert!(tc.default_layout().is_some());
    }

    #[test]
    fn style_names_are_unique() {
        let (tc,ret) = read(&format!("{}Style Standard\n  LatexName std\nEnd\nStyle Section_Star\n  TocLevel 1\nEnd\n\
            Style Part\n  TocLevel -1\nEnd\n",MINIMAL),ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        let names : Vec<&str> = tc.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names,vec![PLAIN_LAYOUT,"Standard","Section Star","Part"]);
        assert_eq!(tc.layout("Standard").unwrap().latexname,"std");
        assert_eq!((tc.min_toclevel(),tc.max_toclevel()),(-1,1));
    }

    #[test]
    fn provide_and_modify() {
        let (tc,ret) = read(&format!("{}\
            ProvideStyle Standard\n  LatexName provided\nEnd\n\
            ModifyStyle Missing\n  LatexName modified\nEnd\n\
            ProvideStyle Quote\n  LatexType Environment\nEnd\n\
            ModifyStyle Quote\n  LatexName quote\nEnd\n\
            InsetLayout Note:Comment\n  LabelString Comment\nEnd\n\
            ProvideInsetLayout Note:Comment\n  LabelString Other\nEnd\n\
            ModifyInsetLayout Note:Missing\n  LabelString Other\nEnd\n",MINIMAL),ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        assert_eq!(tc.layout("Standard").unwrap().latexname,"");
        assert!(!tc.has_layout("Missing"));
        let quote = tc.layout("Quote").unwrap();
        assert!(quote.is_environment());
        assert_eq!(quote.latexname,"quote");
        assert_eq!(tc.inset_layouts()["Note:Comment"].labelstring,"Comment");
        assert!(!tc.has_inset_layout("Note:Missing"));
    }

    #[test]
    fn no_style_keeps_default_and_plain() {
        let (tc,ret) = read(&format!("{}Style Other\nEnd\nNoStyle Standard\nNoStyle Plain_Layout\nNoStyle Other\n",MINIMAL),
            ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        assert!(tc.has_layout("Standard"));
        assert!(tc.has_layout(PLAIN_LAYOUT));
        assert!(!tc.has_layout("Other"));
    }

    #[test]
    fn float_blocks_inherit() {
        let (tc,ret) = read(&format!("{}Counter chapter\nEnd\n\
            Float\n  Type figure\n  GuiName Figure\n  Placement tbp\n  Extension lof\n  NumberWithin chapter\n  ListName \"List of Figures\"\nEnd\n\
            Float\n  Type figure\n  GuiName Abbildung\nEnd\n",MINIMAL),ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        let fig = tc.floats().get("figure").unwrap();
        assert_eq!(fig.name,"Abbildung");
        assert_eq!(fig.placement,"tbp");
        assert_eq!(fig.ext,"lof");
        assert_eq!(fig.within,"chapter");
        assert_eq!(fig.listname,"List of Figures");
        assert_eq!(tc.counters().get("figure").unwrap().master,"chapter");
        let sub = tc.counters().get("sub-figure").unwrap();
        assert_eq!(sub.master,"figure");
        assert_eq!(sub.labelstring,"\\alph{sub-figure}");
    }

    #[test]
    fn cite_engines_and_formats() {
        let text = "Format 60\n\
            CiteEngine default\n  Cite$\n  Citet*[][]\n  # a comment\n  citep|citealt=parencite\nEnd\n\
            AddToCiteEngine numerical\n  citenum\n  cite\nEnd\n\
            CiteFormat default\n  !open [\n  cite {%author%}\n  B_etal et al.\nEnd\n\
            CiteFormat numerical\n  cite [%key%]\nEnd\n\
            CiteEngineType numerical\nDefaultBiblio plainnat|authoryear:apalike\nFullAuthorList false\n";
        let (tc,ret) = read(text,ReadType::Module);
        assert_eq!(ret,ReturnValues::Ok);
        let ay = tc.cite_styles(CiteEngineType::AUTHORYEAR);
        let num = tc.cite_styles(CiteEngineType::NUMERICAL);
        assert_eq!(ay.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),vec!["cite","citet","citep"]);
        assert_eq!(num.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),vec!["cite","citet","citep","citenum"]);
        assert!(ay[0].force_upper_case && ay[0].has_qualified_list);
        assert_eq!(tc.cite_command_aliases()["citealt"],"citep");
        assert_eq!(tc.cite_macro(CiteEngineType::NUMERICAL,"!open"),Some("["));
        assert_eq!(tc.cite_macro(CiteEngineType::AUTHORYEAR,"B_etal"),Some("et al."));
        assert_eq!(tc.cite_format(CiteEngineType::AUTHORYEAR,"cite"),Some("{%author%}"));
        assert_eq!(tc.cite_format(CiteEngineType::NUMERICAL,"cite"),Some("[%key%]"));
        assert_eq!(tc.cite_default_biblio()["numerical"],"plainnat");
        assert_eq!(tc.cite_default_biblio()["authoryear"],"apalike");
        assert!(!tc.cite_full_author_list);
    }

    #[test]
    fn cite_engine_reads_do_not_override() {
        let paths = SearchPaths::default();
        let ctx = ReadContext::new(&paths);
        let mut tc = TextClass::new("test");
        assert_eq!(tc.read_str("Format 60\nCiteEngine authoryear\n  citeauthor\nEnd\nCiteFormat default\n  cite A\nEnd\n",
            ReadType::Module,&ctx),ReturnValues::Ok);
        assert_eq!(tc.read_str("Format 60\nCiteEngine default\n  cite\nEnd\nCiteFormat default\n  cite B\n  citet C\nEnd\n",
            ReadType::CiteEngine,&ctx),ReturnValues::Ok);
        assert_eq!(tc.cite_styles(CiteEngineType::AUTHORYEAR).len(),1);
        assert_eq!(tc.cite_styles(CiteEngineType::NUMERICAL)[0].name,"cite");
        assert_eq!(tc.cite_format(CiteEngineType::AUTHORYEAR,"cite"),Some("A"));
        assert_eq!(tc.cite_format(CiteEngineType::NUMERICAL,"citet"),Some("C"));
    }

    #[test]
    fn stdinsets_only_when_not_provided() {
        let lib = LibraryTree::new().file("layouts/stdinsets.inc",
            "Format 60\nInsetLayout Note\n  LabelString Note\nEnd\n");
        let paths = lib.paths();
        let ctx = ReadContext::new(&paths);
        let mut with = TextClass::new("with");
        assert_eq!(with.read_str(MINIMAL,ReadType::BaseClass,&ctx),ReturnValues::Ok);
        assert!(!with.has_inset_layout("Note"));
        let mut without = TextClass::new("without");
        assert_eq!(without.read_str("Format 60\nStyle Standard\nEnd\n",ReadType::BaseClass,&ctx),ReturnValues::Ok);
        assert!(without.has_inset_layout("Note"));
        // a missing stdinsets.inc is not fatal
        let empty = SearchPaths::default();
        let mut tc = TextClass::new("bare");
        assert_eq!(tc.read_str("Format 60\nStyle Standard\nEnd\n",ReadType::BaseClass,&ReadContext::new(&empty)),ReturnValues::Ok);
    }

    #[test]
    fn input_files() {
        let lib = LibraryTree::new()
            .file("layouts/stdclass.inc","Format 60\nProvides stdinsets 1\nStyle Standard\nEnd\nInput ./stdlists.inc\n")
            .file("layouts/stdlists.inc","Format 60\nStyle Itemize\n  LatexType Item_Environment\nEnd\n")
            .file("layouts/article.layout","Format 60\nInput stdclass.inc\nDefaultModule theorems\n")
            .file("layouts/broken.layout","Format 60\nInput missing.inc\nStyle Standard\nEnd\n");
        let paths = lib.paths();
        let ctx = ReadContext::new(&paths);
        let mut tc = TextClass::new("article");
        assert!(tc.load(None,&ctx).is_ok());
        assert!(tc.loaded());
        assert!(tc.has_layout("Itemize"));
        assert_eq!(tc.default_modules(),&["theorems".to_string()]);
        let mut broken = TextClass::new("broken");
        assert!(matches!(broken.load(None,&ctx),Err(LayoutError::Parse(_))));
        assert!(!broken.loaded());
        assert!(matches!(TextClass::new("nope").load(None,&ctx),Err(LayoutError::UnknownClass(_))));
    }

    #[test]
    fn input_cycles_are_errors() {
        let lib = LibraryTree::new()
            .file("layouts/loop.layout","Format 60\nProvides stdinsets 1\nStyle Standard\nEnd\nInput loop.inc\n")
            .file("layouts/loop.inc","Format 60\nInput ./other.inc\n")
            .file("layouts/other.inc","Format 60\nInput loop.inc\n")
            .file("layouts/self.layout","Format 60\nStyle Standard\nEnd\nInput self.layout\n")
            .file("layouts/twice.layout","Format 60\nProvides stdinsets 1\nInput other2.inc\nInput other2.inc\n")
            .file("layouts/other2.inc","Format 60\nStyle Standard\nEnd\n");
        let paths = lib.paths();
        let ctx = ReadContext::new(&paths);
        assert!(matches!(TextClass::new("loop").load(None,&ctx),Err(LayoutError::Parse(_))));
        assert!(matches!(TextClass::new("self").load(None,&ctx),Err(LayoutError::Parse(_))));
        // reading the same file twice in a row is no cycle
        let mut twice = TextClass::new("twice");
        assert!(twice.load(None,&ctx).is_ok());
        assert!(twice.reading.is_empty());
    }

    struct Bump;
    impl LayoutUpgrader for Bump {
        fn upgrade(&self,text:&str) -> Option<String> {
            text.strip_prefix("Format 59").map(|rest| format!("Format 60{}",rest))
        }
    }

    #[test]
    fn old_formats_are_converted() {
        let paths = SearchPaths::default();
        let ctx = ReadContext::new(&paths).with_upgrader(&Bump);
        let mut tc = TextClass::new("old");
        assert_eq!(tc.read_str("Format 59\nProvides stdinsets 1\nStyle Standard\nEnd\n",ReadType::BaseClass,&ctx),
            ReturnValues::OkOldFormat);
        assert!(tc.has_layout("Standard"));
        let mut tc = TextClass::new("older");
        assert_eq!(tc.read_str("Format 12\nStyle Standard\nEnd\n",ReadType::BaseClass,&ctx),ReturnValues::Error);
        let lib = LibraryTree::new().file("layouts/old.layout","Format 59\nProvides stdinsets 1\nStyle Standard\nEnd\n");
        let paths = lib.paths();
        let mut tc = TextClass::new("old");
        assert!(tc.load(None,&ReadContext::new(&paths).with_upgrader(&Bump)).is_ok());
        let mut tc = TextClass::new("old");
        assert!(matches!(tc.load(None,&ReadContext::new(&paths)),Err(LayoutError::Conversion(_))));
    }

    #[test]
    fn misc_directives() {
        let (tc,ret) = read(&format!("{}Columns 2\nSides 3\nSecNumDepth 2\nTocDepth 1\nPageStyle headings\n\
            OutputType docbook\nClassOptions\n  FontSize 11|12\n  Other a4paper\n  Other draft\nEnd\n\
            PackageOptions natbib numbers\nRequires amsmath, graphicx\nProvidesModule natbib\n\
            ExcludesModule jurabib\nOutlinerName figure Figures\nTitleLatexType Environment\n\
            DefaultFont\n  Family Roman\n  Series Medium\nEndFont\nNoFloat none\n",MINIMAL),ReadType::BaseClass);
        assert_eq!(ret,ReturnValues::Ok);
        assert_eq!((tc.columns,tc.sides,tc.secnumdepth,tc.tocdepth),(2,1,2,1));
        assert_eq!(tc.pagestyle,"headings");
        assert_eq!(tc.outputformat,"docbook");
        assert_eq!(tc.opt_fontsize,"11|12");
        assert_eq!(tc.options,"a4paper,draft");
        assert_eq!(tc.package_options()["natbib"],"numbers");
        assert!(tc.requires().contains("graphicx"));
        assert_eq!(tc.provided_modules(),&["natbib".to_string()]);
        assert_eq!(tc.excluded_modules(),&["jurabib".to_string()]);
        assert_eq!(tc.outliner_names()["figure"],"Figures");
        assert_eq!(tc.titletype,TitleLatexType::Environment);
        assert!(tc.default_font().resolved());
        let (tc,_) = read("Format 60\nExcludesModule jurabib\n",ReadType::Module);
        assert!(tc.excluded_modules().is_empty());
    }
}
