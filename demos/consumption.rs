use linky::api::consumption::ConsumptionClient;
use linky::api::DateRange;
use linky::render::CalendarStep;
use linky::{Credentials, Linky};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let session = Linky::new().login(&Credentials::from_env()?)?;
    let consumption = ConsumptionClient::new(&session);

    let yesterday = chrono::Local::now().date_naive() - chrono::Days::new(1);
    let range = DateRange::new(yesterday - chrono::Days::new(6), yesterday);
    println!("range: {:?}", range);

    let daily = consumption.per_day(range)?;
    println!("data: {:?}", daily);
    println!("{}", daily.as_polars_df(CalendarStep::Days)?);
    Ok(())
}
