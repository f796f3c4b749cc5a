//! luxsig - inspect LUX argument signatures and loop layouts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lux_loop::{
    resolve, select_axes, Compress, Granularity, LoopFlags, LoopInfo, LoopMode, ShapeDirectives,
    TraversalOrder,
};
use lux_session::{Options, Session};
use lux_types::{Dims, ElementType};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Inspect LUX argument signatures, loop layouts and result shapes
#[derive(Parser, Debug)]
#[command(name = "luxsig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a signature and print its parameters
    Parse {
        /// The signature, e.g. "i>D*;i>D1;rD1"
        format: String,

        /// Print the parsed form as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a loop rearranges an array's dimensions
    Rearrange {
        /// Dimensions, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        dims: Vec<usize>,

        /// Selected axes, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        axes: Vec<i64>,

        /// Traversal order
        #[arg(long, value_enum, default_value = "each-coord")]
        order: Order,

        /// Advance granularity
        #[arg(long, value_enum, default_value = "element")]
        granularity: Step,
    },

    /// Compute the result shape of a loop
    Resolve {
        /// Source dimensions, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        dims: Vec<usize>,

        /// Selected axes, comma separated
        #[arg(long, value_delimiter = ',')]
        axes: Vec<i64>,

        /// Reduction factors for the selected axes
        #[arg(long, value_delimiter = ',')]
        reduce: Vec<usize>,

        /// Dimensions to prepend
        #[arg(long, value_delimiter = ',')]
        add: Vec<usize>,

        /// Remove selected axes
        #[arg(long, value_enum)]
        compress: Option<CompressArg>,

        /// Keep removed axes with size 1
        #[arg(long)]
        one_dims: bool,
    },
}

/// Traversal order
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Order {
    /// Current axis first, the rest in order
    EachCoord,
    /// Current axis first, the rest fused
    AxisCoord,
    /// Selected axes first, in the given order
    AxisBlock,
}

impl From<Order> for TraversalOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::EachCoord => Self::EachCoord,
            Order::AxisCoord => Self::AxisCoord,
            Order::AxisBlock => Self::AxisBlock,
        }
    }
}

/// Advance granularity
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Step {
    /// One element at a time
    Element,
    /// One row at a time
    Row,
    /// One block at a time
    Block,
}

impl From<Step> for Granularity {
    fn from(step: Step) -> Self {
        match step {
            Step::Element => Self::Element,
            Step::Row => Self::Row,
            Step::Block => Self::Block,
        }
    }
}

/// Axis removal
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CompressArg {
    /// Remove the first selected axis
    First,
    /// Remove all selected axes
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Parse { format, json } => parse_signature(&format, json),
        Commands::Rearrange {
            dims,
            axes,
            order,
            granularity,
        } => rearrange(&dims, &axes, order, granularity),
        Commands::Resolve {
            dims,
            axes,
            reduce,
            add,
            compress,
            one_dims,
        } => {
            let directives = ShapeDirectives {
                reduce: Dims::from_vec(reduce),
                add: Dims::from_vec(add),
                compress: match compress {
                    None => Compress::None,
                    Some(CompressArg::First) => Compress::First,
                    Some(CompressArg::All) => Compress::All,
                },
                keep_one_dims: one_dims,
            };
            resolve_shape(&dims, &axes, &directives)
        }
    }
}

fn parse_signature(format: &str, json: bool) -> Result<()> {
    let session = Session::new(Options::default());
    let specs = session.signature(format)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&*specs)?);
        return Ok(());
    }

    println!("signature: {specs}");
    println!(
        "arguments: {}..={}{}",
        specs.min_arguments(),
        specs.max_arguments(),
        if specs.is_function() { " (function)" } else { "" }
    );
    for (index, p) in specs.params.iter().enumerate() {
        let ty = p.type_spec.map_or_else(
            || "any".to_string(),
            |t| {
                let bound = if t.lower_bound { ">=" } else { "" };
                format!("{bound}{}", t.element_type)
            },
        );
        let dims: Vec<String> = p.dims.iter().map(ToString::to_string).collect();
        println!(
            "  [{index}] {:?}{} type={ty} ref={} axis={} dims=[{}] trailing={:?}",
            p.role,
            if p.optional { "?" } else { "" },
            p.reference.map_or_else(|| "-".to_string(), |r| r.to_string()),
            p.axis_param.map_or_else(|| "-".to_string(), |a| a.to_string()),
            dims.join(","),
            p.trailing,
        );
    }
    Ok(())
}

fn rearrange(dims: &[usize], axes: &[i64], order: Order, step: Step) -> Result<()> {
    let mode = LoopMode::new(order.into()).with_granularity(step.into());
    let mut info = LoopInfo::new(ElementType::Double, dims, axes, LoopFlags::empty(), mode)
        .context("cannot set up loop")?;
    loop {
        println!("axis {:?}:", info.current_axis());
        println!("  rdims    {:?}", info.rdims());
        println!("  rstride  {:?}", info.rstride());
        println!("  steps    {:?}", info.steps());
        println!("  raxes    {:?}", info.raxes());
        println!("  iraxes   {:?}", info.iraxes());
        println!("  boundary {}", info.boundary());
        if !info.next_axis() {
            return Ok(());
        }
    }
}

fn resolve_shape(dims: &[usize], axes: &[i64], directives: &ShapeDirectives) -> Result<()> {
    let selected = select_axes(dims.len(), axes, LoopFlags::empty(), TraversalOrder::EachCoord)?;
    let resolved = resolve(dims, &selected, directives).context("cannot resolve result shape")?;
    if resolved.is_scalar() {
        println!("result: scalar");
    } else {
        println!("result: {:?}", resolved.dims.as_slice());
    }
    println!("loop dims: {:?}", resolved.loop_dims.as_slice());
    println!("loop axes: {:?}", resolved.axes.as_slice());
    Ok(())
}
