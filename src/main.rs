use connprobe::cli::Cli;
use connprobe::config::Config;
use connprobe::core::health::respond;
use connprobe::core::probe::{default_client, ProbeEngine, ProcessEnv, ServiceDescriptor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    // Handle configuration commands
    if cli.init {
        match &cli.config {
            Some(path) => {
                Config::init_at(path)?;
                println!("Created config at {}", path.display());
            }
            None => {
                let path = Config::init()?;
                println!("Created config at {}", path.display());
            }
        }
        return Ok(());
    }

    let config = cli.load_config()?;

    if cli.print {
        config.print()?;
        return Ok(());
    }

    if cli.check {
        config.check()?;
        println!("✓ Configuration valid");
        return Ok(());
    }

    let adapters = config.select(&cli.services)?;

    if cli.list {
        for adapter in &adapters {
            println!("{}\t{}_BASE_URL", adapter.name, adapter.prefix());
        }
        return Ok(());
    }

    // Descriptors are rebuilt from the environment on every run
    let env = ProcessEnv;
    let defaults = config.defaults();
    let descriptors: Vec<ServiceDescriptor> = adapters
        .iter()
        .map(|adapter| {
            let mut descriptor = adapter.descriptor(&env, &defaults);
            cli.apply_overrides(&mut descriptor);
            descriptor
        })
        .collect();

    let engine = ProbeEngine::new(default_client()?);
    let results = engine.probe_all(&descriptors, &env).await;

    let mut engine_failure = false;
    for (descriptor, result) in descriptors.iter().zip(results) {
        let response = respond(&descriptor.name, result);
        engine_failure |= response.is_server_error();
        println!("{}", response.to_json(cli.pretty));
    }

    if engine_failure {
        std::process::exit(1);
    }
    Ok(())
}
