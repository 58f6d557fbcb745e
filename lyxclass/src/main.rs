use std::path::{Path, PathBuf};
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use log::{error, info};
use textclass::prelude::*;
use textclass::upgrade::ScriptUpgrader;

#[derive(Parser,Debug)]
#[clap(author, version, about, long_about = None)]
struct Parameters {
    /// User library directory (searched first; catalogs are written here)
    #[clap(long)]
    user_dir: Option<PathBuf>,

    /// System library directory (searched last)
    #[clap(long)]
    system_dir: Option<PathBuf>,

    /// verbose
    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(subcommand)]
    command: Cmd
}

#[derive(Subcommand,Debug)]
enum Cmd {
    /// List the registered document classes
    Classes,
    /// Build a document class and print what it defines
    Show {
        /// Class name, or path to a local .layout file
        class: String,
        /// Modules to apply, in order
        #[clap(short, long)]
        module: Vec<String>,
        /// Citation engine to apply
        #[clap(short, long)]
        engine: Option<String>,
    },
    /// Syntax-check a layout file (e.g. a document's local layout)
    Validate {
        file: PathBuf
    },
    /// Repair a module selection against a class
    Modules {
        class: String,
        modules: Vec<String>,
    },
    /// List the registered citation engines
    Engines,
    /// Regenerate textclass.lst, lyxmodules.lst and lyxciteengines.lst
    Reconfigure,
}

fn main() -> ExitCode {
    let params = Parameters::parse();
    let level = if params.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::builder().filter_level(level).parse_default_env().init();

    let mut paths = SearchPaths::from_env();
    if let Some(d) = params.user_dir { paths.prepend_root(d) }
    if let Some(d) = params.system_dir { paths.push_root(d) }
    info!("Library roots: {:?}",paths.roots());
    let upgrader = ScriptUpgrader::layout2layout(&paths);
    let mut cats = Catalogs::new(paths);
    if let Some(u) = upgrader { cats = cats.with_upgrader(u) }
    cats.read_all();

    let ret = match params.command {
        Cmd::Classes => { classes(&cats); Ok(()) }
        Cmd::Engines => { engines(&cats); Ok(()) }
        Cmd::Show { class, module, engine } => show(&mut cats,&class,&module,engine.as_deref()),
        Cmd::Validate { file } => validate(&cats,&file),
        Cmd::Modules { class, modules } => repair(&mut cats,&class,&modules),
        Cmd::Reconfigure => cats.reconfigure().map(|scan| {
            println!("{} classes, {} modules, {} cite engines",scan.classes.len(),scan.modules.len(),scan.engines.len());
        })
    };
    match ret {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}",e);
            ExitCode::FAILURE
        }
    }
}

fn classes(cats:&Catalogs) {
    for name in cats.classes.class_list() {
        let Some(lf) = cats.classes.get(&name) else { continue };
        let mark = if lf.is_tex_class_available() { ' ' } else { '!' };
        println!("{} {:<24} {:<40} {}",mark,name,lf.description(),lf.category());
    }
}

fn engines(cats:&Catalogs) {
    for ce in cats.engines.iter() {
        let mark = if ce.is_available(&cats.packages) { ' ' } else { '!' };
        println!("{} {:<16} {:<24} {}",mark,ce.id(),ce.name(),ce.engine_types().join("|"));
    }
}

/// A known class name, or a `.layout` file registered as a local class.
fn resolve_class(cats:&mut Catalogs,class:&str) -> Result<String,LayoutError> {
    if cats.classes.have_class(class) { return Ok(class.to_string()) }
    let p = Path::new(class);
    if p.is_file() {
        let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or(class);
        let dir = p.parent().unwrap_or(Path::new("."));
        if let Some(key) = cats.add_local_layout(stem,dir) { return Ok(key) }
    }
    Err(LayoutError::UnknownClass(class.to_string()))
}

fn show(cats:&mut Catalogs,class:&str,modules:&[String],engine:Option<&str>) -> Result<(),LayoutError> {
    let name = resolve_class(cats,class)?;
    let doc = cats.document_class(&name,modules,engine,false)?;
    println!("Class {} (\\documentclass{{{}}}): {}",doc.name(),doc.latexname(),doc.description());
    if !doc.modules().is_empty() { println!("Modules: {}",doc.modules().join(", ")) }
    if let Some(e) = doc.cite_engine() { println!("Cite engine: {}",e) }
    println!("Default style: {}",doc.default_layout_name());
    println!("Styles:");
    for l in doc.layouts() {
        println!("  {:<32} {:<16} {}",l.name,l.latextype,l.latexname);
    }
    println!("Inset layouts:");
    for name in doc.inset_layouts().keys() { println!("  {}",name) }
    println!("Floats:");
    for (t,f) in doc.floats().iter() { println!("  {:<16} {}",t,f.name) }
    println!("Counters:");
    for (name,c) in doc.counters().iter() { println!("  {:<24} {}",name,c.master) }
    for t in CiteEngineType::BUCKETS {
        let styles = doc.cite_styles(t);
        if styles.is_empty() { continue }
        println!("Cite styles ({}): {}",t.name(),styles.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "));
    }
    Ok(())
}

fn validate(cats:&Catalogs,file:&Path) -> Result<(),LayoutError> {
    let text = std::fs::read_to_string(file).map_err(|e| LayoutError::Io { path:file.to_path_buf(), source:e })?;
    match cats.validate(&text) {
        ReturnValues::Ok => { println!("{}: OK",file.display()); Ok(()) }
        ReturnValues::OkOldFormat => { println!("{}: OK (old format)",file.display()); Ok(()) }
        _ => Err(LayoutError::Parse(file.display().to_string()))
    }
}

fn repair(cats:&mut Catalogs,class:&str,modules:&[String]) -> Result<(),LayoutError> {
    let name = resolve_class(cats,class)?;
    cats.load_class(&name,None)?;
    let lay = cats.classes.get(&name).ok_or_else(|| LayoutError::UnknownClass(name.clone()))?;
    let mut list : LayoutModuleList = modules.iter().collect();
    let changed = list.adapt_to_base_class(lay,&cats.modules,&[]);
    if changed { println!("The module selection had to be changed.") }
    for m in list.iter() {
        match cats.modules.get(m) {
            Some(lm) if !lm.is_available(&cats.packages) =>
                println!("  {} (missing: {})",m,lm.prerequisites().join(", ")),
            Some(lm) => println!("  {} ({})",m,lm.name()),
            None => println!("  {} (not installed)",m)
        }
    }
    Ok(())
}
