use expr_to_il::{analyze, compile, CompileError, IlProgram, KernelConfig, Profile};
use pretty_assertions::assert_eq;

const NEAREST_CENTROID: &str = r#"
// Nearest of two centroids for every point
threads 128;
arg float4 c0;
arg float4 c1;
input2d float4 points 0;
uav raw uint labels 0;
lds uint counts 0 2;

var float4 p = points[float2(tid.xy)];
var float4 d0 = p - c0;
var float4 d1 = p - c1;
var float e0 = d0.x * d0.x + d0.y * d0.y;
var float e1 = d1.x * d1.x + d1.y * d1.y;
var uint label = 0u;
if (e1 < e0) {
    label = 1u;
}
labels[tid_flat] = label;
atomic_add(counts, label, 1u);
barrier;
"#;

fn lines_starting(program: &IlProgram, prefix: &str) -> usize {
    program.lines.iter().filter(|l| l.starts_with(prefix)).count()
}

#[test_log::test]
fn test_nearest_centroid_script() {
    let program = compile(NEAREST_CENTROID, &KernelConfig::default()).unwrap();

    assert_eq!(program.config.threads_per_group, 128);
    assert_eq!(&program.lines[..3], &["il_cs_2_0", "dcl_cb cb0[2]", "dcl_num_thread_per_group 128"]);
    assert_eq!(lines_starting(&program, "dcl_resource_id(0)"), 1);
    assert!(program.lines.contains(&"dcl_raw_uav_id(0)".to_string()));
    assert!(program.lines.contains(&"dcl_struct_lds_id(0) 4,2".to_string()));

    assert_eq!(program.count_opcode("if_logicalnz"), 1);
    assert_eq!(program.count_opcode("endif"), 1);
    assert_eq!(program.count_opcode("uav_raw_store_id(0)"), 1);
    assert_eq!(program.count_opcode("lds_add_id(0)"), 1);
    assert_eq!(program.count_opcode("fence_threads_lds"), 1);
    assert_eq!(program.lines.last().map(String::as_str), Some("end"));
    assert_eq!(program.declarations.args.len(), 2);
}

#[test_log::test]
fn test_header_overrides_config() {
    let config = KernelConfig::new(256).with_wavefront(32);
    let program = compile("threads 32; lds float s 0 32; s[lid_flat] = 0.0; barrier;", &config).unwrap();
    assert_eq!(program.config.threads_per_group, 32);
    assert_eq!(program.config.wavefront_size, 32);
    assert_eq!(program.count_opcode("fence_threads_lds"), 0);

    let program = compile("profile pixel; var float x = 1.0;", &config).unwrap();
    assert_eq!(program.config.profile, Profile::Pixel);
    assert_eq!(program.lines[0], "il_ps_2_0");
    assert!(!program.lines.iter().any(|l| l.starts_with("dcl_num_thread_per_group")));
}

#[test_log::test]
fn test_header_is_only_recorded() {
    let typed = analyze("threads 512; var int i = 0;").unwrap();
    let config = typed.apply_header(KernelConfig::default());
    assert_eq!(config.threads_per_group, 512);
    assert_eq!(config.profile, Profile::Compute);
}

#[test_log::test]
fn test_loops_with_break_and_continue() {
    let source = "var int i = 0; var int sum = 0;\n\
                  while (i < 10) {\n\
                      i = i + 1;\n\
                      if (i == 3) { continue; }\n\
                      if (i > 7) { break; }\n\
                      sum = sum + i;\n\
                  }";
    let program = compile(source, &KernelConfig::default()).unwrap();
    assert_eq!(program.count_opcode("whileloop"), 1);
    assert_eq!(program.count_opcode("break_logicalz"), 1);
    assert_eq!(program.count_opcode("continue"), 1);
    assert_eq!(program.count_opcode("break"), 1);
    assert_eq!(program.count_opcode("endloop"), 1);
    assert_eq!(program.count_opcode("endif"), 2);
}

#[test_log::test]
fn test_compile_errors() {
    let config = KernelConfig::default();
    assert!(matches!(
        compile("var float x = 1 $ 2;", &config),
        Err(CompileError::LexerError { .. })
    ));
    assert!(matches!(
        compile("var float4 a; var int4 b; a = a + b;", &config),
        Err(CompileError::NoSpecialization { .. })
    ));
    assert!(matches!(compile("continue;", &config), Err(CompileError::Structure { .. })));
    assert!(matches!(compile("y = 2;", &config), Err(CompileError::UndefinedVariable { .. })));
    assert!(matches!(compile("var int x", &config), Err(CompileError::ParseError { .. })));
}

#[test_log::test]
fn test_json_output() {
    let program = compile("var uint n = 4u;", &KernelConfig::default()).unwrap();
    let json = program.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["config"]["profile"], "compute");
    assert_eq!(value["stats"]["registers"], 1);
    assert_eq!(value["lines"][0], "il_cs_2_0");
}
