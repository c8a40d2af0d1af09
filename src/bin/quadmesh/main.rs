//! quadmesh CLI - run remeshing pipelines and edits on generated shapes.
//!
//! Usage: quadmesh [--log-level <LEVEL>] <COMMAND> [OPTIONS]
//!
//! Run `quadmesh --help` for available commands.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use quadmesh::algo::{curvature, decimate, edit, remesh, smooth, subdivide, Progress, RemeshControl};
use quadmesh::mesh::{primitives, Mesh};

#[derive(Parser)]
#[command(name = "quadmesh")]
#[command(author, version, about = "Quad-dominant remeshing CLI", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh statistics
    Info {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Show curvature statistics
        #[arg(long)]
        curvature: bool,
    },

    /// Smooth a mesh
    Smooth {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Number of iterations
        #[arg(short, long, default_value = "1")]
        iterations: usize,

        /// Smoothing factor (0.0 to 1.0)
        #[arg(short, long, default_value = "0.5")]
        factor: f64,

        /// Keep boundary vertices fixed
        #[arg(long)]
        preserve_boundary: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Catmull-Clark subdivide a mesh
    Subdivide {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Number of subdivision iterations
        #[arg(short, long, default_value = "1")]
        iterations: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Decimate (simplify) a mesh
    Decimate {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Target ratio of faces to keep (0.0 to 1.0)
        #[arg(short, long, default_value = "0.5")]
        ratio: f64,

        /// Allow boundary edges to be collapsed
        #[arg(long)]
        collapse_boundary: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Merge adjacent triangles into quads
    Quadify {
        #[command(flatten)]
        shape: ShapeArgs,
    },

    /// Run a remeshing pipeline
    Remesh {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Remeshing pipeline
        #[arg(short, long, value_enum, default_value = "quad")]
        method: RemeshMethod,

        /// Density multiplier (adaptive, optimize, quad)
        #[arg(short, long, default_value = "1.0")]
        density: f64,

        /// Target edge length (uniform; default: average edge length)
        #[arg(short = 'l', long)]
        target_length: Option<f64>,

        /// Skip the final smoothing stage (quad)
        #[arg(long)]
        no_smooth: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Args)]
struct ShapeArgs {
    /// Shape to generate
    #[arg(short, long, value_enum, default_value = "sphere")]
    shape: Shape,

    /// Grid cells per side, or sphere segments (rings are half of that)
    #[arg(short = 'n', long, default_value = "16")]
    resolution: usize,

    /// Grid side length or sphere radius
    #[arg(long, default_value = "1.0")]
    size: f64,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Unit cube with twelve triangles
    Cube,
    /// Unit cube with six quads
    QuadCube,
    /// Closed tetrahedron
    Tetrahedron,
    /// Flat triangle grid
    Grid,
    /// Flat quad grid
    QuadGrid,
    /// UV sphere
    Sphere,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum RemeshMethod {
    /// Curvature-driven refinement and relaxation
    Adaptive,
    /// Split long and collapse short edges around a target length
    Uniform,
    /// Adaptive refinement plus extraordinary-vertex relaxation
    Optimize,
    /// Triangle-to-quad conversion, refinement and smoothing
    Quad,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Info { shape, curvature } => cmd_info(&shape, curvature),
        Commands::Smooth {
            shape,
            iterations,
            factor,
            preserve_boundary,
            sequential,
        } => cmd_smooth(&shape, iterations, factor, preserve_boundary, sequential),
        Commands::Subdivide {
            shape,
            iterations,
            sequential,
        } => cmd_subdivide(&shape, iterations, sequential),
        Commands::Decimate {
            shape,
            ratio,
            collapse_boundary,
            sequential,
        } => cmd_decimate(&shape, ratio, collapse_boundary, sequential),
        Commands::Quadify { shape } => cmd_quadify(&shape),
        Commands::Remesh {
            shape,
            method,
            density,
            target_length,
            no_smooth,
            sequential,
        } => cmd_remesh(&shape, method, density, target_length, no_smooth, sequential),
    }
}

fn build_shape(args: &ShapeArgs) -> Result<Mesh, Box<dyn std::error::Error>> {
    let mesh = match args.shape {
        Shape::Cube => primitives::triangle_cube()?,
        Shape::QuadCube => primitives::quad_cube()?,
        Shape::Tetrahedron => primitives::tetrahedron()?,
        Shape::Grid => primitives::triangle_grid(args.resolution, args.size)?,
        Shape::QuadGrid => primitives::quad_grid(args.resolution, args.size)?,
        Shape::Sphere => {
            primitives::uv_sphere(args.size, args.resolution, (args.resolution / 2).max(2))?
        }
    };
    println!("Generated: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    Ok(mesh)
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only ever move forward
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {:<24}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn print_stats(mesh: &Mesh) {
    println!(
        "Result: {} vertices, {} edges, {} faces ({} quads, {} triangles, quad ratio {:.2})",
        mesh.num_vertices(),
        mesh.num_edges(),
        mesh.num_faces(),
        mesh.num_quads(),
        mesh.num_triangles(),
        mesh.quad_ratio()
    );
}

fn cmd_info(shape: &ShapeArgs, show_curvature: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = build_shape(shape)?;

    println!("Edges: {}", mesh.num_edges());
    println!("Euler characteristic: {}", mesh.euler_characteristic());
    println!("Surface area: {:.6}", mesh.surface_area());

    let bounds = mesh.bounds()?;
    let extent = bounds.extent();
    println!(
        "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
        bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
    );
    println!("Dimensions: {:.3} x {:.3} x {:.3}", extent.x, extent.y, extent.z);

    println!("Average edge length: {:.6}", mesh.average_edge_length());
    if let Some((min, max)) = mesh.edge_length_range() {
        println!("Edge length range: [{:.6}, {:.6}]", min, max);
    }

    if mesh.is_triangle_mesh() {
        println!("Mesh type: Triangle mesh");
    } else if mesh.is_quad_mesh() {
        println!("Mesh type: Quad mesh");
    } else {
        println!("Mesh type: Mixed polygon mesh ({:.0}% quads)", mesh.quad_ratio() * 100.0);
    }

    let boundary = mesh.vertex_ids().filter(|&v| mesh.is_boundary_vertex(v)).count();
    if boundary == 0 {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary vertices)", boundary);
    }

    let extraordinary = mesh.vertex_ids().filter(|&v| mesh.valence(v) != 4).count();
    println!("Extraordinary vertices: {}", extraordinary);

    if show_curvature {
        let curv = curvature::compute_curvature(&mesh, true);
        let min = mesh.vertex_ids().map(|v| curv.get(v)).fold(f64::INFINITY, f64::min);
        println!("\nCurvature:");
        println!("  min={:.4}, max={:.4}, avg={:.4}", min, curv.max(), curv.mean(&mesh));
    }

    Ok(())
}

fn cmd_smooth(
    shape: &ShapeArgs,
    iterations: usize,
    factor: f64,
    preserve_boundary: bool,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = build_shape(shape)?;

    let options = smooth::SmoothOptions::new(factor, iterations)
        .with_preserve_boundary(preserve_boundary)
        .with_parallel(!sequential);
    let mode = if sequential { "sequential" } else { "parallel" };
    let progress = create_progress();

    println!("Applying Laplacian smoothing ({} iterations, factor={}, {})...", iterations, factor, mode);
    let start = Instant::now();
    smooth::laplacian_smooth_with_progress(&mut mesh, &options, &progress)?;
    let elapsed = start.elapsed();

    print_stats(&mesh);
    println!("Done ({:.2?})", elapsed);
    Ok(())
}

fn cmd_subdivide(
    shape: &ShapeArgs,
    iterations: usize,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = build_shape(shape)?;

    let options = subdivide::SubdivideOptions::new(iterations).with_parallel(!sequential);
    let mode = if sequential { "sequential" } else { "parallel" };
    let progress = create_progress();

    println!("Applying Catmull-Clark subdivision ({} iterations, {})...", iterations, mode);
    let start = Instant::now();
    subdivide::subdivide_smooth_with_progress(&mut mesh, &options, &progress)?;
    let elapsed = start.elapsed();

    print_stats(&mesh);
    println!("Done ({:.2?})", elapsed);
    Ok(())
}

fn cmd_decimate(
    shape: &ShapeArgs,
    ratio: f64,
    collapse_boundary: bool,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = build_shape(shape)?;

    let options = decimate::DecimateOptions::with_target_ratio(ratio)
        .with_preserve_boundary(!collapse_boundary)
        .with_parallel(!sequential);
    let mode = if sequential { "sequential" } else { "parallel" };
    let progress = create_progress();

    println!("Decimating to {:.0}% of faces ({})...", ratio * 100.0, mode);
    let start = Instant::now();
    let ran = decimate::decimate_with_progress(&mut mesh, &options, &progress)?;
    let elapsed = start.elapsed();

    if !ran {
        println!("Ratio outside (0, 1): mesh left unchanged");
    }
    print_stats(&mesh);
    println!("Done ({:.2?})", elapsed);
    Ok(())
}

fn cmd_quadify(shape: &ShapeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = build_shape(shape)?;

    let start = Instant::now();
    let report = edit::convert_to_quads(&mut mesh);
    let elapsed = start.elapsed();

    println!("Merged {} triangle pairs ({} triangles left unpaired)", report.merged, report.skipped);
    print_stats(&mesh);
    println!("Done ({:.2?})", elapsed);
    Ok(())
}

fn cmd_remesh(
    shape: &ShapeArgs,
    method: RemeshMethod,
    density: f64,
    target_length: Option<f64>,
    no_smooth: bool,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = build_shape(shape)?;

    let control = RemeshControl::new().with_progress(create_progress());
    let mode = if sequential { "sequential" } else { "parallel" };

    let start = Instant::now();
    let report = match method {
        RemeshMethod::Adaptive => {
            println!("Applying adaptive remeshing (density={}, {})...", density, mode);
            let options = remesh::AdaptiveOptions::new(density).with_parallel(!sequential);
            remesh::adaptive_remesh_with_control(&mut mesh, &options, &control)?
        }
        RemeshMethod::Uniform => {
            let avg_edge = mesh.average_edge_length();
            let target = target_length.unwrap_or(avg_edge);
            println!("Current average edge length: {:.6}", avg_edge);
            println!("Applying uniform remeshing (target={:.6})...", target);
            let options = remesh::UniformOptions::new(target);
            remesh::uniform_remesh_with_control(&mut mesh, &options, &control)?
        }
        RemeshMethod::Optimize => {
            println!("Applying optimizing remesh (density={}, {})...", density, mode);
            let options = remesh::OptimizeOptions::new(density).with_parallel(!sequential);
            remesh::optimize_remesh_with_control(&mut mesh, &options, &control)?
        }
        RemeshMethod::Quad => {
            println!("Applying quad remeshing (density={}, {})...", density, mode);
            let options = remesh::QuadRemeshOptions::new(density)
                .with_smooth(!no_smooth)
                .with_parallel(!sequential);
            remesh::remesh_quad_with_control(&mut mesh, &options, &control)?
        }
    };
    let elapsed = start.elapsed();

    println!(
        "Stages: {}",
        report.stages.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" -> ")
    );
    println!(
        "Merged {}, split {}, collapsed {}, skipped {}, moved {}",
        report.merged, report.split, report.collapsed, report.skipped, report.moved
    );
    print_stats(&mesh);
    println!("Done ({:.2?})", elapsed);
    Ok(())
}
