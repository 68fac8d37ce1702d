//! End-to-end checks through the public API.

use std::io::Cursor;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use glam::Vec3;

use soundbites::colour::ColourMapperKind;
use soundbites::geom::Surface;
use soundbites::params::{ParamHost, ParamValue};
use soundbites::remote::{decode_packet, encode_message, OscArg, OscMessage, ParamUpdate};
use soundbites::sculpture::SculptureSystem;
use soundbites::shaper::{fold_frequency, Shaper, ShaperKind};
use soundbites::spectrum::SpectrumHistory;

fn build(kind: ShaperKind, history: &SpectrumHistory) -> (Box<dyn Shaper>, ParamHost) {
    let mut params = ParamHost::new();
    let mut shaper = kind.create(ColourMapperKind::White.instance());
    shaper.initialise(&mut params);
    shaper.create_surface(history, &params).unwrap();
    shaper.update(0.0);
    (shaper, params)
}

#[test]
fn test_ring_quiet_slice_sits_on_torus() {
    let (shaper, _) = build(ShaperKind::Ring, &SpectrumHistory::zeroed(4, 4));
    let surface = shaper.active_surfaces()[0];
    assert_eq!((surface.x_size(), surface.y_size()), (4, 8));

    for y in 0..8 {
        let v = surface.vertex(0, y).unwrap();
        // Within the tube around the torus centre line
        let from_axis = Vec3::new(v.x, 0.0, v.z).length();
        assert!((179.99..=220.01).contains(&from_axis), "vertex {} at {:?}", y, v);
        assert_relative_eq!(v.distance(Vec3::new(200.0, 0.0, 0.0)), 20.0, epsilon = 1e-3);
    }
}

#[test]
fn test_plane_heights() {
    let history = SpectrumHistory::new(vec![vec![0.0, 0.5, 1.0]; 3]).unwrap();
    let (shaper, _) = build(ShaperKind::Plane, &history);
    let surface = shaper.active_surfaces()[0];
    let ys: Vec<f32> = (0..3).map(|y| surface.vertex(1, y).unwrap().y).collect();
    assert_eq!(ys, vec![0.0, 50.0, 100.0]);
}

#[test]
fn test_update_leaves_other_slices_untouched() {
    for kind in ShaperKind::ALL {
        let history = SpectrumHistory::zeroed(6, 4);
        let (mut shaper, params) = build(kind, &history);
        let before: Vec<Vec3> = shaper.active_surfaces()[0].vertices().to_vec();

        shaper.update_surface(2, &[1.0, 0.8, 0.6, 0.4], &params).unwrap();
        shaper.update(0.0);

        let surface = shaper.active_surfaces()[0];
        let width = surface.x_size();
        for (i, (a, b)) in before.iter().zip(surface.vertices()).enumerate() {
            if i % width != 2 {
                assert_eq!(a, b, "{} changed vertex {}", kind, i);
            }
        }
        assert_eq!(surface.dirty_count(), 0);
    }
}

#[test]
fn test_split_update_leaves_other_slices_untouched() {
    let history = SpectrumHistory::zeroed(6, 4);
    let (mut shaper, params) = build(ShaperKind::Ring, &history);
    shaper.set_split_mode(true);
    let before: Vec<Vec<Vec3>> = shaper
        .active_surfaces()
        .iter()
        .map(|s| s.vertices().to_vec())
        .collect();
    assert_eq!(before.len(), 2);

    shaper.update_surface(2, &[1.0, 0.8, 0.6, 0.4], &params).unwrap();
    shaper.update(0.0);

    for (half, (surface, old)) in shaper.active_surfaces().into_iter().zip(&before).enumerate() {
        let width = surface.x_size();
        let mut reshaped = 0;
        for (i, (a, b)) in old.iter().zip(surface.vertices()).enumerate() {
            if i % width == 2 {
                reshaped += usize::from(a != b);
            } else {
                assert_eq!(a, b, "half {} changed vertex {}", half, i);
            }
        }
        // Every row of the half belongs to the loud slice
        assert_eq!(reshaped, surface.y_size(), "half {}", half);
        assert_eq!(surface.dirty_count(), 0);
    }
}

#[test]
fn test_single_triangle_stl() {
    let mut surface = Surface::new(2, 2).unwrap();
    surface.set_vertex(1, 0, Vec3::X).unwrap();
    surface.set_vertex(0, 1, Vec3::Y).unwrap();
    surface.add_triangle(0, 0, 1, 0, 0, 1).unwrap();

    let mut out = Vec::new();
    surface.write_stl(&mut out, 1.0).unwrap();
    let text = String::from_utf8(out).unwrap();
    // (v3 - v1) x (v2 - v1) = Y x X
    assert!(text.contains("facet normal 0 0 -1\n"));
    let vertices: Vec<&str> = text.lines().filter(|l| l.starts_with("vertex")).collect();
    assert_eq!(vertices, vec!["vertex 0 0 0", "vertex 1 0 0", "vertex 0 1 0"]);
}

#[test]
fn test_obj_counts() {
    let (shaper, _) = build(ShaperKind::Sphere, &SpectrumHistory::zeroed(5, 3));
    let mut out = Vec::new();
    shaper.write_obj(&mut out, 1.0).unwrap();
    let text = String::from_utf8(out).unwrap();

    let surface = shaper.active_surfaces()[0];
    assert_eq!(
        text.lines().filter(|l| l.starts_with("v ")).count(),
        surface.vertex_count()
    );
    assert_eq!(
        text.lines().filter(|l| l.starts_with("f ")).count(),
        surface.triangle_count()
    );
    // Every face index is 1-based and in range
    for line in text.lines().filter(|l| l.starts_with("f ")) {
        for idx in line[2..].split(' ').map(|i| i.parse::<usize>().unwrap()) {
            assert!((1..=surface.vertex_count()).contains(&idx));
        }
    }
}

#[test]
fn test_fold_boundaries() {
    assert_eq!(fold_frequency(8, 8), 7);
    assert_eq!(fold_frequency(0, 8), 0);
    assert_eq!(fold_frequency(15, 8), 0);
    assert_eq!(fold_frequency(16, 8), 0);
}

#[test]
fn test_log_compression() {
    let mut log = String::from("time\tf0\tf1\n");
    for i in 0..10 {
        log.push_str(&format!("{}\t{}\t0.5\n", i, i as f32 / 10.0));
    }
    let history = SpectrumHistory::from_log(Cursor::new(log), 4).unwrap();
    // step = (9 / 4) + 1 = 3
    assert_eq!(history.len(), 3);
    assert_eq!(history.freq_count(), 2);
    assert_relative_eq!(history.row(0).unwrap()[0], 0.1, epsilon = 1e-6);
    assert_relative_eq!(history.row(0).unwrap()[1], 0.5, epsilon = 1e-6);
}

#[test]
fn test_malformed_log() {
    let log = "header\n0\t0.1\t0.2\n1\t0.3\n";
    assert!(SpectrumHistory::from_log(Cursor::new(log), 720).is_err());
    let log = "header\n0\t0.1\tloud\n";
    assert!(SpectrumHistory::from_log(Cursor::new(log), 720).is_err());
}

#[test]
fn test_remote_packet_drives_scene() {
    let mut system = SculptureSystem::new(SpectrumHistory::zeroed(8, 4)).unwrap();
    let start = Instant::now();

    let packet = encode_message(&OscMessage::new(
        "/render/shaper",
        vec![OscArg::Str("cylinder".into())],
    ));
    for msg in decode_packet(&packet).unwrap() {
        system.apply(ParamUpdate::from_message(&msg).unwrap()).unwrap();
    }
    system.tick(start).unwrap();
    assert_eq!(system.shaper_kind(), ShaperKind::Cylinder);

    let packet = encode_message(&OscMessage::from_param(
        "/shaper/radius",
        &ParamValue::Float(120.0),
    ));
    for msg in decode_packet(&packet).unwrap() {
        system.apply(ParamUpdate::from_message(&msg).unwrap()).unwrap();
    }
    system.tick(start).unwrap();
    assert!(system.rebuild_pending());
    system.tick(start + Duration::from_secs(2)).unwrap();
    assert!(!system.rebuild_pending());
}

#[test]
fn test_remote_bundle_selects_shaper_with_sliders() {
    let mut system = SculptureSystem::new(SpectrumHistory::zeroed(8, 4)).unwrap();

    // Slider first: it only exists once the sphere is active
    let messages = [
        OscMessage::from_param("/shaper/radius", &ParamValue::Float(250.0)),
        OscMessage::new("/render/shaper", vec![OscArg::Str("SPHERE".into())]),
    ];
    for msg in &messages {
        let packet = encode_message(msg);
        for msg in decode_packet(&packet).unwrap() {
            system.apply(ParamUpdate::from_message(&msg).unwrap()).unwrap();
        }
    }
    system.tick(Instant::now()).unwrap();

    assert_eq!(system.shaper_kind(), ShaperKind::Sphere);
    assert_eq!(system.params().float("/shaper/radius"), Some(250.0));
    let v = system.shaper().active_surfaces()[0].vertex(0, 0).unwrap();
    assert_relative_eq!(v.length(), 250.0, epsilon = 1e-2);
}
