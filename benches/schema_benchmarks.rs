use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hclschema::{create_schema_from_source, parser::Parser, SchemaOptions};

// ============================================================================
// Test Data
// ============================================================================

const SMALL_MODULE: &str = r#"
variable "name" {
  type        = string
  description = "Resource name"
}

variable "count" {
  type    = number
  default = 1
}
"#;

const MEDIUM_MODULE: &str = r#"
variable "servers" {
  type = list(object({
    host    = string
    port    = optional(number, 8080)
    ssl     = optional(bool, false)
    tags    = optional(map(string), {})
    weights = optional(tuple([number, number]))
  }))
  default = [
    { host = "a.example.com", port = 443, ssl = true },
    { host = "b.example.com" },
  ]
}

variable "env" {
  type = string

  validation {
    condition     = contains(["dev", "staging", "prod"], var.env)
    error_message = "Unknown environment."
  }
}

variable "replicas" {
  type    = number
  default = 3

  validation {
    condition     = var.replicas >= 1 && var.replicas <= 10
    error_message = "Between 1 and 10 replicas."
  }
}

variable "prefix" {
  type     = string
  nullable = true
  default  = null

  validation {
    condition     = can(regex("^[a-z][a-z0-9-]*$", var.prefix))
    error_message = "Lowercase letters, digits and dashes."
  }
}
"#;

fn generate_module(variables: usize) -> String {
    let mut source = String::new();
    for i in 0..variables {
        source.push_str(&format!(
            "variable \"var_{i}\" {{\n  type = object({{\n    id   = number\n    name = optional(string, \"item-{i}\")\n  }})\n\n  validation {{\n    condition     = length(var.var_{i}) > 0\n    error_message = \"Required.\"\n  }}\n}}\n\n"
        ));
    }
    source
}

// ============================================================================
// Front End Benchmarks
// ============================================================================

fn bench_parser_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_by_size");

    for (name, source) in [("small", SMALL_MODULE), ("medium", MEDIUM_MODULE)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| Parser::new(black_box(src)).parse_body())
        });
    }

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_schema_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_by_size");
    let options = SchemaOptions::default();

    for (name, source) in [("small", SMALL_MODULE), ("medium", MEDIUM_MODULE)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| create_schema_from_source(black_box(src), "variables.tf", &options))
        });
    }

    group.finish();
}

fn bench_schema_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_variable_scaling");
    let options = SchemaOptions::default();

    for size in [10, 100, 500] {
        let source = generate_module(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| create_schema_from_source(black_box(src), "variables.tf", &options))
        });
    }

    group.finish();
}

criterion_group!(front_end_benches, bench_parser_sizes);
criterion_group!(schema_benches, bench_schema_sizes, bench_schema_scaling);
criterion_main!(front_end_benches, schema_benches);
