use itertools::Itertools;
use std::sync::Arc;
use wbem_mock::config::AppConfig;
use wbem_mock::seed;
use wbem_mock::store::{ClassStore, InMemoryRepository, InstanceStore};
use wbem_mock::{RequestContext, WbemServer};

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with INFO level by default, RUST_LOG overrides
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("wbem-mock: in-memory WBEM repository");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: namespace={} mode={:?} pull timeout={}s (max {}s)",
        config.server.default_namespace,
        config.server.repo_mode,
        config.pull.default_operation_timeout,
        config.pull.max_operation_timeout
    );

    let repository = Arc::new(InMemoryRepository::new());
    let server = WbemServer::with_repository(repository.clone(), config.engine_config());
    server.ensure_namespace(&config.server.default_namespace);
    let ctx = RequestContext::new(&config.server.default_namespace).with_mode(config.server.repo_mode);

    // Load seed data for demonstration (optional)
    if config.seed.load_demo || std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading demo schema...");
        let summary = seed::load_seed_data(&server, &ctx)?;
        println!(
            "Demo schema loaded: {} qualifier(s), {} class(es), {} instance(s)",
            summary.qualifiers, summary.classes, summary.instances
        );
    }

    if let Some(path) = &config.seed.objects_file {
        println!("Loading objects from {}...", path);
        let objects = seed::load_objects_file(path)?;
        server.add_cim_objects(&ctx, objects)?;
    }

    for namespace in server.namespaces() {
        let (classes, instances) = repository.read(namespace.as_str(), |data| {
            let classes = data.list_classes(None).iter().map(|c| c.classname.as_str()).join(", ");
            Ok((classes, data.list_instances(None).len()))
        })?;
        println!("{namespace}: {instances} instance(s); classes [{classes}]");
    }

    Ok(())
}
