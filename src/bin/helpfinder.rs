use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use hf_directory::{
    categories::{self, CategoryTable},
    constants::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVICE_LIMIT},
    filter::SortOrder,
    util::http_client_with_timeout,
    Client, EndpointConfig, NavigationSession, Phase, ResultsView, SearchStateStore, Snapshot,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "helpfinder", about = "Find community services near a location")]
struct CliArgs {
    #[command(subcommand)]
    pub subcommand: Command,

    #[command(flatten)]
    pub global_opts: GlobalOpts,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    #[arg(long, env = "HELPFINDER_API_BASE", default_value = DEFAULT_API_BASE_URL, global = true)]
    pub api_base: String,

    #[arg(long, help = "Override the services endpoint", global = true)]
    pub services_endpoint: Option<String>,

    #[arg(long, help = "Override the geocode endpoint", global = true)]
    pub geocode_endpoint: Option<String>,

    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    #[arg(long, help = "Category dataset to use instead of the built-in one", global = true)]
    pub categories: Option<PathBuf>,

    #[arg(
        long,
        env = "HELPFINDER_STATE_FILE",
        default_value = ".helpfinder-state.json",
        global = true
    )]
    pub state_file: PathBuf,

    #[arg(long, env = "HELPFINDER_SESSION", default_value = "default", global = true)]
    pub session: String,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    #[clap(about = "Resolve a UK postcode to coordinates")]
    Geocode { postcode: String },

    #[clap(about = "Search for services and show the results")]
    Search {
        #[command(flatten)]
        location_opts: LocationOpts,

        #[arg(short = 'c', long, help = "Only show this category")]
        category: Option<String>,

        #[arg(short = 's', long, requires = "category", help = "Only show this sub-category")]
        sub_category: Option<String>,

        #[arg(long, default_value = "distance", help = "distance or alpha")]
        sort: SortOrder,

        #[arg(short = 'n', long, default_value_t = DEFAULT_SERVICE_LIMIT)]
        limit: u32,

        #[command(flatten)]
        output_opts: OutputOpts,
    },

    #[clap(about = "Open a service from the last search, saving the search")]
    Open {
        service_id: String,

        #[arg(long, help = "Scroll position to save with the search")]
        scroll: Option<u32>,
    },

    #[clap(about = "Return to the saved search without fetching again")]
    Back {
        #[command(flatten)]
        output_opts: OutputOpts,
    },

    #[clap(about = "List the service categories")]
    Categories,
}

#[derive(Args, Debug, PartialEq)]
struct LocationOpts {
    #[arg(short = 'p', long, conflicts_with_all = ["lat", "browse_all"])]
    pub postcode: Option<String>,

    #[arg(long, requires = "lng", allow_negative_numbers = true, conflicts_with = "browse_all")]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    #[arg(long, help = "Ignore location and list every service")]
    pub browse_all: bool,
}

#[derive(Args, Debug, PartialEq)]
struct OutputOpts {
    #[arg(long, help = "Include the map view")]
    pub map: bool,

    #[arg(long, help = "Print a plain listing instead of JSON")]
    pub text: bool,
}

fn build_client(opts: &GlobalOpts) -> Result<Client> {
    let mut endpoints = EndpointConfig::from_base(&opts.api_base);
    if let Some(services) = &opts.services_endpoint {
        endpoints.services = Some(services.clone());
    }
    if let Some(geocode) = &opts.geocode_endpoint {
        endpoints.geocode = Some(geocode.clone());
    }
    let http = http_client_with_timeout(Duration::from_secs(opts.timeout_secs))?;
    Ok(Client::new(http, Some(endpoints))?)
}

fn print_snapshot(snapshot: &Snapshot, text: bool) -> Result<()> {
    if !text {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }
    match &snapshot.phase {
        Phase::Loading => println!("Loading..."),
        Phase::Empty => println!("No services found."),
        Phase::Error {
            message,
            affordances,
            ..
        } => {
            println!("{message}");
            let options: Vec<String> = affordances
                .iter()
                .filter_map(|a| serde_json::to_value(a).ok())
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            println!("Options: {}", options.join(", "));
        }
        Phase::Populated { cards } => {
            for card in cards {
                let service = &card.service.service;
                println!("[{}] {}", service.id, service.name);
                println!("    {} / {}", service.category_name, service.sub_category_name);
                if !service.organisation.name.is_empty() {
                    println!("    {}", service.organisation.name);
                }
                if let Some(distance) = &card.distance_text {
                    println!("    {distance}");
                }
            }
        }
    }
    if let Some(map) = &snapshot.map {
        println!("Map: {} markers", map.markers.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    let opts = &args.global_opts;

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&opts.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &opts.categories {
        let table = CategoryTable::load(path)
            .await
            .with_context(|| format!("loading categories from {}", path.display()))?;
        categories::init(table).map_err(|_| anyhow!("category table already installed"))?;
    }

    let session = NavigationSession::new(opts.session.clone());

    match args.subcommand {
        Command::Geocode { postcode } => {
            let client = build_client(opts)?;
            match client.geocode(&postcode).await {
                Ok(location) => println!("{}", serde_json::to_string_pretty(&location)?),
                Err(e) => {
                    let mut view = ResultsView::default();
                    view.fail_geocode(&e);
                    println!("{}", serde_json::to_string_pretty(&view.phase())?);
                }
            }
        }
        Command::Search {
            location_opts,
            category,
            sub_category,
            sort,
            limit,
            output_opts,
        } => {
            let client = build_client(opts)?;
            let mut view = ResultsView::new(limit);
            match (location_opts.postcode, location_opts.lat, location_opts.lng) {
                (Some(postcode), _, _) => {
                    view.search_postcode(&client, &postcode).await;
                }
                (None, Some(lat), Some(lng)) => {
                    view.search_coordinates(&client, lat, lng).await;
                }
                _ => {
                    view.browse_all_services(&client).await;
                }
            }
            if let Some(category) = &category {
                view.set_category(category);
            }
            if let Some(sub_category) = &sub_category {
                view.set_sub_category(sub_category);
            }
            view.set_sort_order(sort);
            if output_opts.map {
                view.toggle_map();
            }

            let mut store = SearchStateStore::load_or_default(&opts.state_file).await?;
            store.save(&session, view.capture());
            store.save_to(&opts.state_file).await?;
            info!(%session, services = view.services().len(), "search saved");

            print_snapshot(&view.snapshot(), output_opts.text)?;
        }
        Command::Open { service_id, scroll } => {
            let mut store = SearchStateStore::load_or_default(&opts.state_file).await?;
            let Some(state) = store.peek(&session).cloned() else {
                bail!("no search saved for session `{session}`, run `helpfinder search` first");
            };
            let mut view = ResultsView::default();
            view.replay(state);
            if let Some(scroll) = scroll {
                view.set_scroll_position(scroll);
            }
            let service = view
                .navigate_to_service(&mut store, &session, &service_id)
                .ok_or_else(|| anyhow!("service `{service_id}` is not in the saved search"))?;
            store.save_to(&opts.state_file).await?;
            debug!(%session, service = %service_id, "opened service");
            println!("{}", serde_json::to_string_pretty(&service)?);
        }
        Command::Back { output_opts } => {
            let mut store = SearchStateStore::load_or_default(&opts.state_file).await?;
            let mut view = ResultsView::default();
            if !view.restore(&mut store, &session) {
                bail!("no search saved for session `{session}`");
            }
            if output_opts.map {
                view.toggle_map();
            }
            print_snapshot(&view.snapshot(), output_opts.text)?;
        }
        Command::Categories => {
            let table = categories::lookup();
            println!("{}", serde_json::to_string_pretty(table.categories())?);
        }
    }

    Ok(())
}
