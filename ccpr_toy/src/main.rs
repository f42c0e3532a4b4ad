// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visualize the geometry the coverage processor draws for one render pass in an SVG.

use std::path::PathBuf;

use anyhow::{bail, Context};
use ccpr_geometry::backend::{DrawOutcome, Recording};
use ccpr_geometry::kurbo::{Point, Rect, Vec2};
use ccpr_geometry::view::GeometryView;
use ccpr_geometry::{Config, Geometry, Instances, RenderPass, Verb};
use clap::Parser;
use log::{info, warn};
use svg::node::element::path::Data;
use svg::node::element::{Circle, Line, Path, Rectangle};
use svg::{Document, Node};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut view = GeometryView::new(Config::debug());
    let config = view.config().with_bloat(args.bloat);
    view.set_config(config);
    if let Some(points) = args.points {
        view.set_points(points);
    }
    for key in args.keys.chars() {
        if !view.handle_key(key) {
            warn!("Ignoring unknown key `{key}`");
        }
    }
    if let Some(pass) = args.pass {
        view.set_render_pass(pass);
    }
    for [x, y, dx, dy] in args.drag {
        let target = view.find_drag_target(x, y);
        info!("Dragging {target:?} by ({dx}, {dy})");
        view.drag(target, Vec2::new(dx, dy));
    }

    let mut backend = Recording::new();
    let bounds = match view.draw(&mut backend) {
        DrawOutcome::Submitted { instance_count } => {
            info!("Submitted {instance_count} instances");
            backend.draws().next().map(|draw| draw.bounds)
        }
        outcome => {
            warn!("Nothing drawn: {outcome:?}");
            None
        }
    };

    let caption = view.caption(true);
    let tallies = view.tallies();
    println!("{caption}, {:?} stage", view.render_pass().stage());
    println!(
        "{} triangles, {} quadratics, {} cubics, {} bytes uploaded",
        tallies.triangles,
        tallies.quadratics,
        tallies.cubics,
        backend.allocated()
    );
    if let Some(klm) = view.cubic_klm() {
        for (name, row) in ["K", "L", "M"].into_iter().zip(klm.klm.to_f32()) {
            println!("{name} = {row:?}");
        }
    }
    if args.dump {
        println!("{}", view.dump_points());
    }

    let (width, height) = (f32::from(args.width), f32::from(args.height));
    let mut document =
        Document::new().set("viewBox", (-10, -10, args.width + 20, args.height + 20));

    draw_border(&mut document, width, height);
    if let Some(bounds) = bounds {
        draw_bounds(&mut document, bounds);
    }
    draw_instances(&mut document, view.render_pass(), view.instances());
    draw_geometry(&mut document, view.geometry());
    draw_klm_lines(&mut document, &view, width, height);
    draw_control_points(&mut document, &view);

    svg::save(&args.output, &document)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("Wrote {}", args.output.display());
    Ok(())
}

fn draw_border(document: &mut Document, width: f32, height: f32) {
    let border_data = Data::new()
        .move_to((0, 0))
        .line_to((width, 0.0_f32))
        .line_to((width, height))
        .line_to((0.0_f32, height))
        .close();

    let border = Path::new()
        .set("stroke-width", 0.5)
        .set("fill", "none")
        .set("vectorEffect", "non-scaling-stroke")
        .set("stroke", "black")
        .set("d", border_data);

    document.append(border);
}

fn draw_bounds(document: &mut Document, bounds: Rect) {
    let rect = Rectangle::new()
        .set("x", bounds.x0 as f32)
        .set("y", bounds.y0 as f32)
        .set("width", bounds.width() as f32)
        .set("height", bounds.height() as f32)
        .set("fill", "none")
        .set("stroke", "grey")
        .set("stroke-dasharray", "4 2")
        .set("stroke-width", 0.5);

    document.append(rect);
}

fn to_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn draw_instances(document: &mut Document, pass: RenderPass, instances: &Instances) {
    let (color, instance_points): (_, Vec<Vec<Point>>) = if pass.is_cubic() {
        (
            "crimson",
            instances.cubics.iter().map(|c| c.points().to_vec()).collect(),
        )
    } else {
        (
            "darkblue",
            instances
                .triangles
                .iter()
                .map(|t| t.points().to_vec())
                .collect(),
        )
    };

    for points in instance_points {
        let Some((&first, rest)) = points.split_first() else {
            continue;
        };
        // The control polygon, which contains the curve of a cubic instance.
        let mut data = Data::new().move_to(to_f32(first));
        for p in rest {
            data = data.line_to(to_f32(*p));
        }
        data = data.close();

        let path = Path::new()
            .set("stroke-width", 0.5)
            .set("stroke", color)
            .set("fill", color)
            .set("fill-opacity", 0.1)
            .set("d", data);

        document.append(path);
    }
}

fn draw_geometry(document: &mut Document, geometry: &Geometry) {
    let mut data = Data::new();

    for segment in geometry.segments() {
        let coords = |points: &[Point]| -> Vec<f32> {
            points
                .iter()
                .flat_map(|p| [p.x as f32, p.y as f32])
                .collect()
        };
        data = match (segment.verb, segment.points) {
            (Verb::BeginContour, &[start]) => data.move_to(to_f32(start)),
            (Verb::LineTo, &[_, end]) => data.line_to(to_f32(end)),
            (Verb::MonotonicQuadraticTo, [_, rest @ ..]) => {
                data.quadratic_curve_to(coords(rest))
            }
            (Verb::MonotonicCubicTo, [_, rest @ ..]) => data.cubic_curve_to(coords(rest)),
            (Verb::EndClosedContour, _) => data.close(),
            _ => data,
        };
    }

    let outline = Path::new()
        .set("stroke-width", 1)
        .set("stroke", "green")
        .set("fill", "none")
        .set("d", data);

    document.append(outline);

    // Mark where the segments meet.
    for segment in geometry.segments().filter(|s| s.verb.is_segment()) {
        let Some(end) = segment.end_point() else {
            continue;
        };
        let (cx, cy) = to_f32(end);
        let circle = Circle::new()
            .set("cx", cx)
            .set("cy", cy)
            .set("r", 2)
            .set("fill", "green");

        document.append(circle);
    }
}

fn draw_klm_lines(document: &mut Document, view: &GeometryView, width: f32, height: f32) {
    let lines = view.klm_lines(f64::from(width), f64::from(height));
    for (line, color) in lines.into_iter().zip(["yellow", "blue", "red"]) {
        let Some(line) = line else {
            continue;
        };
        let (x1, y1) = to_f32(line.p0);
        let (x2, y2) = to_f32(line.p1);
        let line = Line::new()
            .set("x1", x1)
            .set("y1", y1)
            .set("x2", x2)
            .set("y2", y2)
            .set("stroke", color)
            .set("stroke-width", 1);

        document.append(line);
    }
}

fn draw_control_points(document: &mut Document, view: &GeometryView) {
    for (i, p) in view.active_points() {
        let (cx, cy) = to_f32(p);
        let circle = Circle::new()
            .set("id", format!("point{i}"))
            .set("cx", cx)
            .set("cy", cy)
            .set("r", 4)
            .set("fill", "purple")
            .set("fill-opacity", 0.5);

        document.append(circle);
    }
}

#[derive(Parser, Debug)]
struct Args {
    /// The width of the viewport.
    #[arg(long, default_value_t = 800, value_parser = parse_dim)]
    pub width: u16,
    /// The height of the viewport.
    #[arg(long, default_value_t = 600, value_parser = parse_dim)]
    pub height: u16,
    /// The render pass to show, as a key from 1 to 7 or a pass name.
    #[arg(short, long)]
    pub pass: Option<RenderPass>,
    /// Key presses to replay before drawing, e.g. `6D`.
    #[arg(short, long, default_value = "")]
    pub keys: String,
    /// The four control points, as eight comma separated coordinates.
    #[arg(long, value_parser = parse_points)]
    pub points: Option<[Point; 4]>,
    /// A drag from `x,y` by `dx,dy`. Can be repeated.
    #[arg(long, value_parser = parse_drag)]
    pub drag: Vec<[f64; 4]>,
    /// How far the coverage processor bloats each primitive, in pixels.
    #[arg(short, long, default_value_t = ccpr_geometry::config::DEBUG_BLOAT)]
    pub bloat: f64,
    /// Print the control points as a Rust array.
    #[arg(long)]
    pub dump: bool,
    /// Where to write the SVG.
    #[arg(short, long, default_value = "ccpr_debug.svg")]
    pub output: PathBuf,
}

fn parse_dim(val: &str) -> Result<u16, String> {
    let parsed = val
        .parse::<u16>()
        .map_err(|_| "Width/Height must be a positive integer")?;
    if parsed == 0 || parsed > 4096 {
        Err("The width/height must be between 1 and 4096.".to_string())
    } else {
        Ok(parsed)
    }
}

fn parse_numbers<const N: usize>(val: &str) -> anyhow::Result<[f64; N]> {
    let numbers = val
        .split(',')
        .map(|n| n.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;
    let Ok(numbers) = <[f64; N]>::try_from(numbers) else {
        bail!("expected {N} comma separated numbers");
    };
    Ok(numbers)
}

fn parse_points(val: &str) -> Result<[Point; 4], String> {
    let [x0, y0, x1, y1, x2, y2, x3, y3] = parse_numbers::<8>(val).map_err(|e| e.to_string())?;
    Ok([
        Point::new(x0, y0),
        Point::new(x1, y1),
        Point::new(x2, y2),
        Point::new(x3, y3),
    ])
}

fn parse_drag(val: &str) -> Result<[f64; 4], String> {
    parse_numbers(val).map_err(|e| e.to_string())
}
