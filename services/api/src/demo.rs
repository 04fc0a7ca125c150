use chrono::{Local, NaiveDate, NaiveTime};
use clap::Args;
use std::sync::Arc;
use visa_portal::applications::{
    Application, ApplicationDocument, ApplicationDraft, ApplicationStatus, ApplicationStore,
    ApplicationStoreError, DocumentStatus, LifecycleError,
};
use visa_portal::catalog::filter::PRICE_DOMAIN_MIN;
use visa_portal::catalog::{
    filter_countries, standard_catalog, CatalogStore, Country, FacetValue, FilterCriteria,
};
use visa_portal::error::AppError;
use visa_portal::identity::{Caller, CallerRole};
use visa_portal::persistence::MemorySnapshots;
use visa_portal::tracking::{TrackingLookup, TrackingProjector};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Free-text search over country names, tags, and visa types.
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Continent facet; repeat to select several.
    #[arg(long)]
    pub(crate) continent: Vec<String>,
    /// Upper bound of the price range.
    #[arg(long)]
    pub(crate) max_price: Option<i64>,
    /// Date recorded on the demo application (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Stop after the catalog portion of the demo.
    #[arg(long)]
    pub(crate) skip_application: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        search,
        continent,
        max_price,
        today,
        skip_application,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Visa portal demo");
    let catalog = CatalogStore::open(Arc::new(MemorySnapshots::default()), standard_catalog())?;
    let criteria = demo_criteria(search, continent, max_price);
    let matches = filter_countries(catalog.countries(), &criteria);

    println!(
        "\nCatalog: {} of {} destinations match",
        matches.len(),
        catalog.countries().len()
    );
    for country in &matches {
        render_country(country);
    }

    if skip_application {
        return Ok(());
    }

    let Some(destination) = matches.first().copied().or_else(|| catalog.countries().first()) else {
        println!("\nNo destination available for the application demo");
        return Ok(());
    };

    println!("\nApplication lifecycle for {}", destination.name);
    let mut store = ApplicationStore::open(Arc::new(MemorySnapshots::default()))?;
    let id = store.create(demo_draft(destination), today)?;
    render_steps(store.get(&id), "submitted");

    store.assign_agent(&id, "AGENT001")?;
    store.set_status(&id, ApplicationStatus::Processing)?;
    store.advance_step(&id, today)?;
    render_steps(store.get(&id), "documents verified");

    store.set_status(&id, ApplicationStatus::Approved)?;
    render_steps(store.get(&id), "approved");

    match store.set_status(&id, ApplicationStatus::Processing) {
        Err(ApplicationStoreError::Lifecycle(error)) => println!("  Refused: {error}"),
        other => println!("  Unexpected outcome: {other:?}"),
    }
    match store.advance_step(&id, today) {
        Err(ApplicationStoreError::Lifecycle(LifecycleError::NoNextStep)) => {
            println!("  Refused: no step left to advance")
        }
        other => println!("  Unexpected outcome: {other:?}"),
    }

    let admin = Caller::new("ADMIN001", CallerRole::Admin);
    let event = store.reopen(
        &id,
        ApplicationStatus::Processing,
        &admin,
        "approval recorded against the wrong passport",
        today.and_time(NaiveTime::MIN).and_utc(),
    )?;
    println!(
        "  Override by {}: {} -> {} ({})",
        event.actor_id,
        event.from.label(),
        event.to.label(),
        event.reason
    );

    match TrackingProjector::new(store.applications()).lookup(&id.0) {
        TrackingLookup::Found(tracked) => match serde_json::to_string_pretty(&tracked) {
            Ok(json) => println!("\nPublic tracking payload:\n{json}"),
            Err(err) => println!("\nPublic tracking payload unavailable: {err}"),
        },
        TrackingLookup::NotFound => println!("\nTracking lookup returned nothing for {id}"),
    }

    Ok(())
}

fn demo_criteria(
    search: Option<String>,
    continents: Vec<String>,
    max_price: Option<i64>,
) -> FilterCriteria {
    let mut criteria = continents
        .into_iter()
        .fold(FilterCriteria::default(), |criteria, continent| {
            criteria.with(FacetValue::Continent(continent.to_lowercase()))
        });
    if let Some(search) = search {
        criteria = criteria.with_search(search);
    }
    if let Some(max_price) = max_price {
        criteria = criteria.with_price_range(PRICE_DOMAIN_MIN, max_price);
    }
    criteria
}

fn demo_draft(destination: &Country) -> ApplicationDraft {
    let visa_type = destination
        .visa_types
        .first()
        .map(|visa_type| visa_type.name.clone())
        .unwrap_or_else(|| "Tourist Visa".to_string());

    ApplicationDraft {
        user_id: "9876543212".to_string(),
        agent_id: None,
        country: destination.name.clone(),
        visa_type,
        applicant_name: "Demo Applicant".to_string(),
        amount: destination.price + destination.fees,
        documents: vec![
            ApplicationDocument {
                name: "Passport".to_string(),
                status: DocumentStatus::Verified,
            },
            ApplicationDocument {
                name: "Bank Statement".to_string(),
                status: DocumentStatus::Pending,
            },
        ],
    }
}

fn render_country(country: &Country) {
    let tags: Vec<&str> = country.tags.iter().map(String::as_str).collect();
    println!(
        "- {} ({}) | {} | {} | processing {} | tags: {}",
        country.name,
        country.code,
        country.continent,
        country.price,
        country.processing_time,
        tags.join(", ")
    );
}

fn render_steps(application: Option<&Application>, label: &str) {
    let Some(application) = application else {
        return;
    };
    let steps: Vec<String> = application
        .steps
        .iter()
        .map(|step| format!("{} [{:?}]", step.title, step.status))
        .collect();
    println!(
        "- {} {} -> status {} | {}",
        application.id,
        label,
        application.status.label(),
        steps.join(" > ")
    );
}
