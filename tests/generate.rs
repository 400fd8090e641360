use std::path::PathBuf;

use markshot::{
    GenerateOpts, MarkshotError, MarkshotResult, RenderBackend, RenderRequest, Surface,
    TextOptions, builtin_specs, escape_text, generate_all, load_specs,
};

/// Backend that records calls instead of producing pixels. "PNG" bytes embed
/// the painted markup so tests can assert per-file content.
#[derive(Default)]
struct FakeBackend {
    painted: Vec<String>,
    fail_on_render: Option<usize>,
}

impl RenderBackend for FakeBackend {
    fn measure(&mut self, _markup: &str, _opts: &TextOptions) -> MarkshotResult<(u32, u32)> {
        if self.fail_on_render == Some(self.painted.len()) {
            return Err(MarkshotError::render("synthetic measure failure"));
        }
        Ok((10, 4))
    }

    fn create_surface(&mut self, width: u32, height: u32) -> MarkshotResult<Surface> {
        Surface::new(width, height)
    }

    fn paint(
        &mut self,
        _surface: &mut Surface,
        markup: &str,
        _opts: &TextOptions,
    ) -> MarkshotResult<()> {
        self.painted.push(markup.to_string());
        Ok(())
    }

    fn encode_png(&mut self, _surface: &Surface) -> MarkshotResult<Vec<u8>> {
        let markup = self.painted.last().cloned().unwrap_or_default();
        Ok(format!("fakepng:{markup}").into_bytes())
    }
}

fn test_opts(dir: &str) -> GenerateOpts {
    GenerateOpts {
        out_dir: PathBuf::from("target").join(dir),
        ..GenerateOpts::default()
    }
}

fn zone_request() -> RenderRequest {
    RenderRequest {
        sentence: "Growth comes from stepping out of the comfort zone.".to_string(),
        highlight: "comfort zone".to_string(),
        basename: "demo".to_string(),
    }
}

#[test]
fn one_file_per_spec_in_table_order() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_all_specs");
    let mut backend = FakeBackend::default();

    let written = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap();

    assert_eq!(written.len(), specs.len());
    for (path, spec) in written.iter().zip(&specs) {
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("demo{}.png", spec.suffix)
        );
        assert!(path.exists(), "missing {}", path.display());
    }

    // Every variant paints exactly one highlight span.
    assert_eq!(backend.painted.len(), specs.len());
    for markup in &backend.painted {
        assert_eq!(markup.matches("<span ").count(), 1);
        assert!(markup.contains(">comfort zone</span>"));
    }

    // The per-file bytes carry the variant's own attribute.
    let weight = std::fs::read(&written[3]).unwrap();
    assert!(String::from_utf8(weight).unwrap().contains("weight='bold'"));
    let rise = std::fs::read(&written[7]).unwrap();
    assert!(String::from_utf8(rise).unwrap().contains("rise='10000'"));
}

#[test]
fn empty_highlight_paints_plain_escaped_sentence() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_empty_highlight");
    let mut backend = FakeBackend::default();

    let req = RenderRequest {
        highlight: String::new(),
        ..zone_request()
    };
    let written = generate_all(&req, &specs, &mut backend, &opts).unwrap();

    assert_eq!(written.len(), specs.len());
    for markup in &backend.painted {
        assert_eq!(markup, &escape_text(&req.sentence));
    }
}

#[test]
fn unmatched_highlight_is_not_an_error() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_unmatched_highlight");
    let mut backend = FakeBackend::default();

    let req = RenderRequest {
        highlight: "not in the sentence".to_string(),
        ..zone_request()
    };
    let written = generate_all(&req, &specs, &mut backend, &opts).unwrap();
    assert_eq!(written.len(), specs.len());
    assert!(backend.painted.iter().all(|m| !m.contains("<span")));
}

#[test]
fn failure_aborts_remaining_specs_and_names_the_suffix() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_fail_fast");
    let _ = std::fs::remove_dir_all(&opts.out_dir);

    let mut backend = FakeBackend {
        fail_on_render: Some(2),
        ..FakeBackend::default()
    };

    let err = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'_family'"), "unexpected message: {msg}");
    assert!(msg.contains("2 image(s) already written"), "{msg}");

    assert!(opts.out_dir.join("demo_color.png").exists());
    assert!(opts.out_dir.join("demo_size.png").exists());
    assert!(!opts.out_dir.join("demo_family.png").exists());
    assert!(!opts.out_dir.join("demo_weight.png").exists());
}

#[test]
fn missing_output_directory_is_created() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_mkdir/nested/deeper");
    let _ = std::fs::remove_dir_all("target/gen_mkdir");
    assert!(!opts.out_dir.exists());

    let mut backend = FakeBackend::default();
    let written = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap();
    assert_eq!(written.len(), specs.len());
    assert!(written.iter().all(|p| p.exists()));
}

#[test]
fn precondition_errors_touch_nothing() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_preconditions");
    let mut backend = FakeBackend::default();

    let empty = RenderRequest {
        sentence: String::new(),
        ..zone_request()
    };
    assert!(matches!(
        generate_all(&empty, &specs, &mut backend, &opts),
        Err(MarkshotError::Validation(_))
    ));

    let bad_basename = RenderRequest {
        basename: "demos/demo".to_string(),
        ..zone_request()
    };
    assert!(matches!(
        generate_all(&bad_basename, &specs, &mut backend, &opts),
        Err(MarkshotError::Validation(_))
    ));

    assert!(backend.painted.is_empty());
}

#[test]
fn spec_suffix_with_path_separator_is_rejected() {
    let opts = test_opts("gen_bad_suffix");
    let _ = std::fs::remove_dir_all(&opts.out_dir);
    let mut backend = FakeBackend::default();

    let mut specs = builtin_specs(48.0);
    specs[0].suffix = "/../escaped".to_string();

    assert!(matches!(
        generate_all(&zone_request(), &specs, &mut backend, &opts),
        Err(MarkshotError::Validation(_))
    ));
    assert!(backend.painted.is_empty());
}

#[test]
fn oversized_margin_fails_cleanly_instead_of_overflowing() {
    let specs = builtin_specs(48.0);
    let opts = GenerateOpts {
        margin_px: u32::MAX,
        ..test_opts("gen_huge_margin")
    };
    let mut backend = FakeBackend::default();

    let err = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap_err();
    assert!(err.to_string().contains("'_color'"), "{err}");
}

#[test]
fn rerun_overwrites_byte_identically() {
    let specs = builtin_specs(48.0);
    let opts = test_opts("gen_rerun");
    let mut backend = FakeBackend::default();

    let first = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap();
    let before = std::fs::read(&first[0]).unwrap();
    let second = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second[0]).unwrap(), before);
}

#[test]
fn alternate_spec_table_from_json() {
    let dir = PathBuf::from("target").join("gen_spec_table");
    std::fs::create_dir_all(&dir).unwrap();
    let table_path = dir.join("specs.json");
    std::fs::write(
        &table_path,
        r##"[
            {"suffix": "_red", "attribute": "foreground", "value": "#ff0000"},
            {"suffix": "_big", "attribute": "size", "value": "98304"}
        ]"##,
    )
    .unwrap();

    let specs = load_specs(&table_path).unwrap();
    assert_eq!(specs.len(), 2);

    let opts = test_opts("gen_spec_table/out");
    let mut backend = FakeBackend::default();
    let written = generate_all(&zone_request(), &specs, &mut backend, &opts).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("demo_red.png"));
    assert!(written[1].ends_with("demo_big.png"));
}

#[test]
fn empty_spec_table_file_is_rejected() {
    let dir = PathBuf::from("target").join("gen_spec_table_empty");
    std::fs::create_dir_all(&dir).unwrap();
    let table_path = dir.join("specs.json");
    std::fs::write(&table_path, "[]").unwrap();
    assert!(load_specs(&table_path).is_err());
}
