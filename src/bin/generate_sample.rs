//! Writes a synthetic question bank to `sample_data/`, one parquet file per
//! subject, in the layout the dashboard reads from a directory source.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;

const FIRST_YEAR: i64 = 2009;
const LAST_YEAR: i64 = 2023;
const QUESTIONS_PER_YEAR: usize = 15;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Index drawn with probability proportional to `weights`.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (i, &w) in weights.iter().enumerate() {
            if target < w {
                return i;
            }
            target -= w;
        }
        weights.len().saturating_sub(1)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Topic {
    name: &'static str,
    sub_topics: &'static [&'static str],
}

struct Front {
    name: &'static str,
    weight: f64,
    topics: &'static [Topic],
}

const PHYSICS: &[Front] = &[
    Front {
        name: "Mecânica",
        weight: 5.0,
        topics: &[
            Topic {
                name: "Cinemática",
                sub_topics: &["MRU", "MRUV", "Lançamentos"],
            },
            Topic {
                name: "Dinâmica",
                sub_topics: &["Leis de Newton", "Atrito", "Plano inclinado"],
            },
            Topic {
                name: "Energia",
                sub_topics: &["Trabalho", "Potência", "Conservação"],
            },
        ],
    },
    Front {
        name: "Eletromagnetismo",
        weight: 4.0,
        topics: &[
            Topic {
                name: "Circuitos",
                sub_topics: &["Resistores", "Potência elétrica", "Consumo"],
            },
            Topic {
                name: "Magnetismo",
                sub_topics: &["Indução", "Força magnética"],
            },
        ],
    },
    Front {
        name: "Ondulatória",
        weight: 2.0,
        topics: &[Topic {
            name: "Ondas",
            sub_topics: &["Som", "Ressonância", "Efeito Doppler"],
        }],
    },
    Front {
        name: "Óptica",
        weight: 1.5,
        topics: &[
            Topic {
                name: "Espelhos",
                sub_topics: &["Espelhos planos", "Espelhos esféricos"],
            },
            Topic {
                name: "Refração",
                sub_topics: &["Lentes", "Reflexão total"],
            },
        ],
    },
    Front {
        name: "Termofísica",
        weight: 2.5,
        topics: &[
            Topic {
                name: "Calorimetria",
                sub_topics: &["Calor sensível", "Mudança de fase"],
            },
            Topic {
                name: "Termodinâmica",
                sub_topics: &["Máquinas térmicas", "Gases"],
            },
        ],
    },
];

const CHEMISTRY: &[Front] = &[
    Front {
        name: "Química Geral",
        weight: 3.0,
        topics: &[
            Topic {
                name: "Estequiometria",
                sub_topics: &["Mol", "Rendimento", "Reagente limitante"],
            },
            Topic {
                name: "Ligações",
                sub_topics: &["Polaridade", "Forças intermoleculares"],
            },
        ],
    },
    Front {
        name: "Físico-Química",
        weight: 3.5,
        topics: &[
            Topic {
                name: "Eletroquímica",
                sub_topics: &["Pilhas", "Eletrólise"],
            },
            Topic {
                name: "Soluções",
                sub_topics: &["Concentração", "Diluição"],
            },
            Topic {
                name: "Equilíbrio",
                sub_topics: &["pH", "Le Chatelier"],
            },
        ],
    },
    Front {
        name: "Orgânica",
        weight: 3.0,
        topics: &[
            Topic {
                name: "Funções orgânicas",
                sub_topics: &["Álcoois", "Ésteres", "Aminas"],
            },
            Topic {
                name: "Reações orgânicas",
                sub_topics: &["Combustão", "Polímeros"],
            },
        ],
    },
    Front {
        name: "Ambiental",
        weight: 1.5,
        topics: &[Topic {
            name: "Poluição",
            sub_topics: &["Chuva ácida", "Efeito estufa"],
        }],
    },
];

const BIOLOGY: &[Front] = &[
    Front {
        name: "Ecologia",
        weight: 4.0,
        topics: &[
            Topic {
                name: "Cadeias alimentares",
                sub_topics: &["Níveis tróficos", "Bioacumulação"],
            },
            Topic {
                name: "Ciclos biogeoquímicos",
                sub_topics: &["Carbono", "Nitrogênio"],
            },
        ],
    },
    Front {
        name: "Genética",
        weight: 2.5,
        topics: &[
            Topic {
                name: "Hereditariedade",
                sub_topics: &["1ª Lei de Mendel", "Heredograma"],
            },
            Topic {
                name: "Biotecnologia",
                sub_topics: &["Transgênicos", "Clonagem"],
            },
        ],
    },
    Front {
        name: "Fisiologia",
        weight: 3.0,
        topics: &[
            Topic {
                name: "Sistema imune",
                sub_topics: &["Vacinas", "Soro"],
            },
            Topic {
                name: "Digestão",
                sub_topics: &["Enzimas", "Absorção"],
            },
        ],
    },
    Front {
        name: "Citologia",
        weight: 2.0,
        topics: &[Topic {
            name: "Organelas",
            sub_topics: &["Mitocôndria", "Cloroplasto"],
        }],
    },
];

const KINDS: &[&str] = &["Conta", "Conceitual", "Mista"];

/// Column-oriented rows of one subject file.
#[derive(Default)]
struct Columns {
    year: Vec<i64>,
    front: Vec<String>,
    topic: Vec<String>,
    sub_1: Vec<Option<String>>,
    sub_2: Vec<Option<String>>,
    kind: Vec<String>,
}

fn generate(fronts: &[Front], kind_weights: &[f64], rng: &mut SimpleRng) -> Columns {
    let weights: Vec<f64> = fronts.iter().map(|f| f.weight).collect();
    let mut cols = Columns::default();

    for year in FIRST_YEAR..=LAST_YEAR {
        for _ in 0..QUESTIONS_PER_YEAR {
            let front = &fronts[rng.weighted(&weights)];
            let topic = &front.topics[(rng.next_u64() % front.topics.len() as u64) as usize];

            let first = rng.pick(topic.sub_topics);
            // Roughly one question in ten has no sub-topic at all.
            let sub_1 = (rng.next_f64() > 0.1).then(|| first.to_string());
            let sub_2 = if sub_1.is_some() && rng.next_f64() < 0.35 {
                let second = rng.pick(topic.sub_topics);
                (second != first).then(|| second.to_string())
            } else {
                None
            };

            cols.year.push(year);
            cols.front.push(front.name.to_string());
            cols.topic.push(topic.name.to_string());
            cols.sub_1.push(sub_1);
            cols.sub_2.push(sub_2);
            cols.kind.push(KINDS[rng.weighted(kind_weights)].to_string());
        }
    }
    cols
}

fn to_batch(cols: Columns) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Ano", DataType::Int64, false),
        Field::new("Frente", DataType::Utf8, false),
        Field::new("Tópico", DataType::Utf8, false),
        Field::new("Subtópico 1", DataType::Utf8, true),
        Field::new("Subtópico 2", DataType::Utf8, true),
        Field::new("Tipo", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(cols.year)),
            Arc::new(StringArray::from(cols.front)),
            Arc::new(StringArray::from(cols.topic)),
            Arc::new(StringArray::from(cols.sub_1)),
            Arc::new(StringArray::from(cols.sub_2)),
            Arc::new(StringArray::from(cols.kind)),
        ],
    )
    .context("Failed to create RecordBatch")?;
    Ok(batch)
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("Failed to create writer")?;
    writer.write(batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let out_dir = Path::new("sample_data");
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let subjects: [(&str, &[Front], [f64; 3]); 3] = [
        ("Fisica", PHYSICS, [0.6, 0.25, 0.15]),
        ("Quimica", CHEMISTRY, [0.4, 0.4, 0.2]),
        ("Biologia", BIOLOGY, [0.05, 0.85, 0.1]),
    ];

    for (sheet, fronts, kind_weights) in subjects {
        let batch = to_batch(generate(fronts, &kind_weights, &mut rng))?;
        let path = out_dir.join(format!("{sheet}.parquet"));
        write_parquet(&path, &batch)?;

        println!("Wrote {} questions to {}", batch.num_rows(), path.display());
        println!("{}", pretty_format_batches(&[batch.slice(0, 3)])?);
    }

    println!(
        "Point the dashboard at the folder with `[source] path = \"{}\"` in dashboard.toml",
        out_dir.display()
    );
    Ok(())
}
