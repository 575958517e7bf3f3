use anyhow::{bail, Context, Result};
use log::info;
use slipmap::{spatial::index::ANY_TYPE, MapRect, StaticIndex, TypeFilter};

const USAGE: &str = "usage: slipmap-inspect <index> [west south east north] [type]";

/// Upper bound on logged matches.
const MAX_RESULTS: usize = 10_000;

struct Args {
    path: String,
    rect: MapRect,
    filter: TypeFilter,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let path = args.next().context(USAGE)?;
    let rest: Vec<String> = args.collect();

    let (rect, type_arg) = match rest.len() {
        0 | 1 => (MapRect::world(), rest.first()),
        4 | 5 => {
            let mut edges = [0.0; 4];
            for (edge, raw) in edges.iter_mut().zip(&rest) {
                *edge = raw
                    .parse()
                    .with_context(|| format!("invalid coordinate {:?}", raw))?;
            }
            let [west, south, east, north] = edges;
            (MapRect::from_geo_bounds(west, south, east, north), rest.get(4))
        }
        _ => bail!(USAGE),
    };

    let filter = match type_arg {
        Some(raw) => TypeFilter::from(
            raw.parse::<i32>()
                .with_context(|| format!("invalid type {:?}", raw))?,
        ),
        None => TypeFilter::from(ANY_TYPE),
    };

    Ok(Args { path, rect, filter })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1))?;
    let index = StaticIndex::open(&args.path)
        .with_context(|| format!("failed to load index {}", args.path))?;

    info!("{}: {} nodes", args.path, index.len());
    if index.is_empty() {
        return Ok(());
    }
    info!("root bounds {}", index.bounds(0));

    let hits = index.query(&args.rect, args.filter, MAX_RESULTS);
    info!("query {} ({:?}) matched {} nodes", args.rect, args.filter, hits.len());
    for slot in hits {
        info!(
            "  slot {:>6}  id {:>8}  type {:>4}  offset {:>8}",
            slot,
            index.id(slot),
            index.node_type(slot),
            index.offset(slot)
        );
    }

    Ok(())
}
