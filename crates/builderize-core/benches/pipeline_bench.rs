use builderize_core::{parse, print, transform, TransformConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const LOOP_SOURCE: &str = r#"package report

import "fmt"

func Render(rows [][]string) string {
	out := "<table>"
	for _, row := range rows {
		out += "<tr>"
		for _, cell := range row {
			out += "<td>" + cell + "</td>"
		}
		out += "</tr>"
	}
	out += "</table>"
	fmt.Println(len(out))
	return out
}
"#;

fn generated_source(functions: usize) -> String {
    let mut source = String::from("package gen\n");
    for i in 0..functions {
        source.push_str(&format!(
            "\nfunc f{i}(xs []string) string {{\n\ts := \"start-of-a-fairly-long-literal-{i}\"\n\tfor _, x := range xs {{\n\t\ts += x + \", \"\n\t}}\n\ts += \"tail-that-is-longer-than-the-default-bound\"\n\treturn s\n}}\n"
        ));
    }
    source
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_loop_source", |b| {
        b.iter(|| {
            if let Ok(tree) = parse(black_box(LOOP_SOURCE)) {
                black_box(&tree);
            }
        })
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let config = TransformConfig::default();
    c.bench_function("pipeline_loop_source", |b| {
        b.iter(|| {
            if let Ok(mut tree) = parse(black_box(LOOP_SOURCE)) {
                transform(&mut tree, &config);
                if let Ok(output) = print(&tree) {
                    black_box(output);
                }
            }
        })
    });
}

fn bench_pipeline_scaling(c: &mut Criterion) {
    let config = TransformConfig::default();
    let mut group = c.benchmark_group("pipeline_scaling");
    for functions in [10, 100, 500] {
        let source = generated_source(functions);
        group.bench_with_input(BenchmarkId::from_parameter(functions), &source, |b, source| {
            b.iter(|| {
                if let Ok(mut tree) = parse(black_box(source)) {
                    transform(&mut tree, &config);
                    if let Ok(output) = print(&tree) {
                        black_box(output);
                    }
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_pipeline, bench_pipeline_scaling);
criterion_main!(benches);
