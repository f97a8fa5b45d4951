use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;

use embedserve::logging::setup_logging;
use embedserve::{
    log_error, DefaultResourceReader, DirectoryCatalog, EmbeddedConventions,
    EmbeddedViewLocationProvider, RequestDescriptor, ResourceCatalog, ServeOptions,
    ViewLocationConfig,
};

mod args;

use args::{Args, CatalogArgs, Command};

fn main() -> embedserve::Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let result = run(args.command);
    if let Err(e) = &result {
        log_error!(e, "embedserve failed");
    }
    result
}

fn load_catalog(args: &CatalogArgs) -> embedserve::Result<Arc<dyn ResourceCatalog>> {
    let catalog = DirectoryCatalog::load(&args.module, &args.serve_dir)?;
    Ok(Arc::new(catalog))
}

fn run(command: Command) -> embedserve::Result<()> {
    match command {
        Command::Resolve {
            catalog,
            virtual_dir,
            namespace,
            method,
            headers,
            zstd_level,
            gzip_level,
            bypass_patterns,
            path,
        } => {
            let options =
                ServeOptions::new(zstd_level, gzip_level).with_bypass_patterns(&bypass_patterns)?;
            let mut conventions = EmbeddedConventions::new(options);
            conventions.add_directory(&virtual_dir, load_catalog(&catalog)?, &namespace);

            let mut request = RequestDescriptor::new(&method, &path);
            for line in &headers {
                request.headers.append_line(line)?;
            }

            let Some(response) = conventions.resolve(&request) else {
                log::warn!("No embedded directory handles {} {}", method, path);
                return Ok(());
            };

            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "HTTP/1.1 {}", response.status)?;
            for (name, value) in response.headers.iter() {
                writeln!(out, "{}: {}", name, value)?;
            }
            writeln!(out)?;
            response.write_to(&mut out)?;
            out.flush()?;
            Ok(())
        }
        Command::Views {
            catalog,
            root_namespace,
            extensions,
        } => {
            let catalog = load_catalog(&catalog)?;
            let mut config = ViewLocationConfig::new();
            if let Some(ns) = &root_namespace {
                config = config.root_namespace(catalog.module(), ns);
            }

            let provider =
                EmbeddedViewLocationProvider::new(DefaultResourceReader, vec![catalog], config);
            let extensions: Vec<&str> = extensions.iter().map(String::as_str).collect();

            for view in provider.located_views(Some(extensions.as_slice())) {
                let path = if view.location.is_empty() {
                    format!("{}.{}", view.name, view.extension)
                } else {
                    format!("{}/{}.{}", view.location, view.name, view.extension)
                };
                println!("{}", path);
            }
            Ok(())
        }
    }
}
