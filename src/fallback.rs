//! Hand-authored content pools and the network-free fallback generators.
//!
//! The default pool backs the mock provider replies. Seeded course materials
//! have their own pools, looked up by material id; anything else (uploads,
//! inline text, unknown ids) uses the default. Offline output is reproducible
//! for a given material and count.

use chrono::Utc;

use crate::agents::exam::rebalance_points;
use crate::config::ExamPolicy;
use crate::domain::{
  Difficulty, ExamMetadata, ExamOptions, ExamQuestion, Flashcard, FlashcardMetadata, FlashcardOptions,
  GeneratedExam, GeneratedFlashcards, GeneratedQuiz, QuestionKind, QuizMetadata, QuizOptions, QuizQuestion,
  MAX_ITEMS_PER_REQUEST,
};
use crate::util::excerpt;

pub const EXCERPT_CHARS: usize = 200;

pub struct PoolQuestion {
  pub question: &'static str,
  pub options: [&'static str; 4],
  pub correct_answer: usize,
  pub explanation: &'static str,
  pub difficulty: Difficulty,
}

pub struct PoolCard {
  pub front: &'static str,
  pub back: &'static str,
  pub category: &'static str,
  pub difficulty: Difficulty,
}

pub struct PoolExamQuestion {
  pub question: &'static str,
  pub options: &'static [&'static str],
  pub correct_answer: usize,
  pub points: u32,
  pub kind: QuestionKind,
  pub explanation: &'static str,
}

pub const QUIZ_POOL: &[PoolQuestion] = &[
  PoolQuestion {
    question: "What is the primary mechanism of plastic deformation in metals?",
    options: ["Vacancy diffusion", "Dislocation motion", "Grain boundary sliding", "Phase transformation"],
    correct_answer: 1,
    explanation: "Plastic deformation in metals occurs primarily through dislocation motion along slip planes.",
    difficulty: Difficulty::Medium,
  },
  PoolQuestion {
    question: "Which crystal structure has the highest packing efficiency?",
    options: ["Simple cubic", "Body-centered cubic", "Face-centered cubic", "Diamond cubic"],
    correct_answer: 2,
    explanation: "FCC (like HCP) reaches a packing factor of 0.74, the highest possible for equal spheres.",
    difficulty: Difficulty::Hard,
  },
  PoolQuestion {
    question: "Which of the following is NOT a primary class of engineering materials?",
    options: ["Metals", "Ceramics", "Composites", "Alloys"],
    correct_answer: 3,
    explanation: "Alloys are a subclass of metals. The main classes are metals, ceramics, polymers and composites.",
    difficulty: Difficulty::Easy,
  },
  PoolQuestion {
    question: "What is the coordination number in a face-centered cubic structure?",
    options: ["6", "8", "12", "14"],
    correct_answer: 2,
    explanation: "Each atom in an FCC lattice has 12 nearest neighbours.",
    difficulty: Difficulty::Medium,
  },
  PoolQuestion {
    question: "What type of point defect occurs when an atom is missing from its lattice site?",
    options: ["Interstitial", "Vacancy", "Substitutional", "Dislocation"],
    correct_answer: 1,
    explanation: "A vacancy is an empty lattice site normally occupied by an atom.",
    difficulty: Difficulty::Easy,
  },
];

pub const CARD_POOL: &[PoolCard] = &[
  PoolCard {
    front: "Elastizitätsmodul",
    back: "Young's modulus: ratio of stress to strain in the elastic range, a measure of stiffness.",
    category: "Material Properties",
    difficulty: Difficulty::Medium,
  },
  PoolCard {
    front: "Versetzung",
    back: "Dislocation: a line defect in the crystal lattice that enables plastic deformation in metals.",
    category: "Crystal Defects",
    difficulty: Difficulty::Medium,
  },
  PoolCard {
    front: "Korngrenze",
    back: "Grain boundary: interface between two crystal grains with different orientation.",
    category: "Microstructure",
    difficulty: Difficulty::Easy,
  },
  PoolCard {
    front: "Leerstelle",
    back: "Vacancy: point defect where an atom is missing from its regular lattice site.",
    category: "Crystal Defects",
    difficulty: Difficulty::Easy,
  },
  PoolCard {
    front: "Einheitszelle",
    back: "Unit cell: the smallest repeating unit of a crystal lattice.",
    category: "Crystal Structures",
    difficulty: Difficulty::Easy,
  },
  PoolCard {
    front: "Packungsdichte",
    back: "Packing factor: fraction of the cell volume occupied by atoms (0.74 for FCC).",
    category: "Crystal Structures",
    difficulty: Difficulty::Hard,
  },
];

pub const EXAM_POOL: &[PoolExamQuestion] = &[
  PoolExamQuestion {
    question: "Which factor most significantly affects the equilibrium concentration of vacancies?",
    options: &["Pressure", "Temperature", "Electric field", "Magnetic field"],
    correct_answer: 1,
    points: 5,
    kind: QuestionKind::MultipleChoice,
    explanation: "Vacancy concentration grows exponentially with temperature (Arrhenius behaviour).",
  },
  PoolExamQuestion {
    question: "According to Fick's first law, the diffusion flux is proportional to what?",
    options: &["The concentration gradient", "The absolute concentration", "The square of time", "The grain size"],
    correct_answer: 0,
    points: 10,
    kind: QuestionKind::MultipleChoice,
    explanation: "J = -D dC/dx: flux follows the negative concentration gradient.",
  },
  PoolExamQuestion {
    question: "A single crystal is loaded with 100 MPa. Slip plane normal and slip direction both make 45° with the loading axis. What is the resolved shear stress?",
    options: &["35.4 MPa", "50.0 MPa", "70.7 MPa", "100 MPa"],
    correct_answer: 1,
    points: 10,
    kind: QuestionKind::Calculation,
    explanation: "Schmid's law: τ = σ·cos(φ)·cos(λ) = 100 MPa · 0.707 · 0.707 ≈ 50 MPa.",
  },
  PoolExamQuestion {
    question: "Derive the relationship between stress and strain for a linear elastic material and explain the physical meaning of Young's modulus.",
    options: &["Essay question - detailed derivation required"],
    correct_answer: 0,
    points: 20,
    kind: QuestionKind::Essay,
    explanation: "This requires understanding of Hooke's law and material stiffness concepts.",
  },
];

/// Topics reported when topic extraction is unavailable.
pub static DEFAULT_TOPICS: &[&str] = &["Material Properties", "Crystal Structure", "Mechanical Behavior"];

/// Quiz questions, cards and exam questions for one material. Every slice is non-empty.
pub struct ContentPool {
  pub quiz: &'static [PoolQuestion],
  pub cards: &'static [PoolCard],
  pub exam: &'static [PoolExamQuestion],
}

pub static DEFAULT_POOL: ContentPool = ContentPool { quiz: QUIZ_POOL, cards: CARD_POOL, exam: EXAM_POOL };

static MATERIAL_POOLS: &[(&str, ContentPool)] = &[
  (
    "w1-ch1",
    ContentPool {
      quiz: &[
        PoolQuestion {
          question: "Which of the following is NOT a primary class of engineering materials?",
          options: ["Metals", "Ceramics", "Composites", "Alloys"],
          correct_answer: 3,
          explanation: "Alloys are a subclass of metals. The main classes are metals, ceramics, polymers and composites.",
          difficulty: Difficulty::Easy,
        },
        PoolQuestion {
          question: "What is the defining characteristic of crystalline materials?",
          options: ["High strength", "Ordered atomic arrangement", "Low density", "High conductivity"],
          correct_answer: 1,
          explanation: "Atoms in a crystal sit in a regular, repeating lattice.",
          difficulty: Difficulty::Easy,
        },
      ],
      cards: &[
        PoolCard {
          front: "Materialklassen",
          back: "Metalle, Keramiken, Polymere und Verbundwerkstoffe: die vier Hauptklassen der Ingenieurwerkstoffe.",
          category: "Material Classes",
          difficulty: Difficulty::Easy,
        },
        PoolCard {
          front: "Kristalline Struktur",
          back: "Regelmäßige, sich wiederholende Anordnung von Atomen in einem Gitter.",
          category: "Crystal Structures",
          difficulty: Difficulty::Easy,
        },
        PoolCard {
          front: "Amorphe Materialien",
          back: "Materialien ohne langreichweitige Ordnung der Atome, zum Beispiel Gläser.",
          category: "Material Classes",
          difficulty: Difficulty::Medium,
        },
      ],
      exam: &[
        PoolExamQuestion {
          question: "Which bonding type dominates in metals?",
          options: &["Ionic", "Covalent", "Metallic", "Van der Waals"],
          correct_answer: 2,
          points: 5,
          kind: QuestionKind::MultipleChoice,
          explanation: "Metals are held together by delocalized valence electrons.",
        },
        PoolExamQuestion {
          question: "Explain the differences between crystalline and amorphous materials, giving examples of each.",
          options: &["Essay question - no multiple choice"],
          correct_answer: 0,
          points: 10,
          kind: QuestionKind::Essay,
          explanation: "Long-range order (metals, salts) versus short-range order only (glasses, many polymers).",
        },
      ],
    },
  ),
  (
    "w1-ch2",
    ContentPool {
      quiz: &[
        PoolQuestion {
          question: "What is the coordination number in a face-centered cubic structure?",
          options: ["6", "8", "12", "14"],
          correct_answer: 2,
          explanation: "Each atom in an FCC lattice has 12 nearest neighbours.",
          difficulty: Difficulty::Medium,
        },
        PoolQuestion {
          question: "Which crystal structure has the highest packing efficiency?",
          options: ["Simple cubic", "Body-centered cubic", "Face-centered cubic", "Diamond cubic"],
          correct_answer: 2,
          explanation: "FCC (like HCP) reaches a packing factor of 0.74.",
          difficulty: Difficulty::Hard,
        },
      ],
      cards: &[
        PoolCard {
          front: "kfz Koordinationszahl",
          back: "12: jedes Atom hat 12 nächste Nachbarn in der kubisch-flächenzentrierten Struktur.",
          category: "Crystal Structures",
          difficulty: Difficulty::Medium,
        },
        PoolCard {
          front: "Packungsdichte",
          back: "Anteil des von Atomen eingenommenen Volumens am Volumen der Einheitszelle.",
          category: "Crystal Structures",
          difficulty: Difficulty::Medium,
        },
        PoolCard {
          front: "Einheitszelle",
          back: "Kleinste Wiederholungseinheit eines Kristallgitters.",
          category: "Crystal Structures",
          difficulty: Difficulty::Easy,
        },
      ],
      exam: &[
        PoolExamQuestion {
          question: "How many atoms belong to one body-centered cubic unit cell?",
          options: &["1", "2", "4", "6"],
          correct_answer: 1,
          points: 5,
          kind: QuestionKind::MultipleChoice,
          explanation: "Eight corners at 1/8 each plus one atom in the center.",
        },
        PoolExamQuestion {
          question: "Calculate the atomic packing factor for a body-centered cubic structure.",
          options: &["Calculation question"],
          correct_answer: 0,
          points: 15,
          kind: QuestionKind::Calculation,
          explanation: "With a = 4r/√3 and two atoms per cell, APF = 2·(4/3)πr³ / a³ ≈ 0.68.",
        },
      ],
    },
  ),
  (
    "w2-ch3",
    ContentPool {
      quiz: &[
        PoolQuestion {
          question: "What type of point defect occurs when an atom is missing from its lattice site?",
          options: ["Interstitial", "Vacancy", "Substitutional", "Dislocation"],
          correct_answer: 1,
          explanation: "A vacancy is an empty lattice site normally occupied by an atom.",
          difficulty: Difficulty::Easy,
        },
        PoolQuestion {
          question: "Which factor most significantly affects the concentration of vacancies?",
          options: ["Pressure", "Temperature", "Electric field", "Magnetic field"],
          correct_answer: 1,
          explanation: "Vacancy concentration grows exponentially with temperature.",
          difficulty: Difficulty::Medium,
        },
      ],
      cards: &[
        PoolCard {
          front: "Leerstelle",
          back: "Punktdefekt, bei dem ein Atom an seinem regulären Gitterplatz fehlt.",
          category: "Crystal Defects",
          difficulty: Difficulty::Easy,
        },
        PoolCard {
          front: "Zwischengitteratom",
          back: "Punktdefekt, bei dem ein Atom einen normalerweise leeren Zwischengitterplatz besetzt.",
          category: "Crystal Defects",
          difficulty: Difficulty::Medium,
        },
        PoolCard {
          front: "Substitutionsatom",
          back: "Fremdatom, das ein Wirtsatom auf einem regulären Gitterplatz ersetzt.",
          category: "Crystal Defects",
          difficulty: Difficulty::Medium,
        },
      ],
      exam: &[
        PoolExamQuestion {
          question: "Which defect is one-dimensional?",
          options: &["Vacancy", "Dislocation", "Grain boundary", "Pore"],
          correct_answer: 1,
          points: 5,
          kind: QuestionKind::MultipleChoice,
          explanation: "Dislocations are line defects.",
        },
        PoolExamQuestion {
          question: "Derive the relationship between vacancy concentration and temperature.",
          options: &["Essay question - derivation required"],
          correct_answer: 0,
          points: 12,
          kind: QuestionKind::Essay,
          explanation: "N_v = N · exp(-Q_v / kT): an Arrhenius dependence on temperature.",
        },
      ],
    },
  ),
  (
    "w2-ch4",
    ContentPool {
      quiz: &[
        PoolQuestion {
          question: "What is the primary driving force for diffusion?",
          options: ["Temperature gradient", "Concentration gradient", "Pressure gradient", "Electric field"],
          correct_answer: 1,
          explanation: "Fick's first law: flux follows the concentration gradient.",
          difficulty: Difficulty::Easy,
        },
        PoolQuestion {
          question: "Which diffusion mechanism is dominant for substitutional atoms in metals?",
          options: ["Interstitial", "Vacancy", "Grain boundary", "Surface"],
          correct_answer: 1,
          explanation: "Substitutional atoms move by exchanging places with vacancies.",
          difficulty: Difficulty::Medium,
        },
      ],
      cards: &[
        PoolCard {
          front: "Ficksches Gesetz",
          back: "J = -D · dC/dx: der Diffusionsfluss ist proportional zum Konzentrationsgradienten.",
          category: "Diffusion",
          difficulty: Difficulty::Medium,
        },
        PoolCard {
          front: "Diffusionskoeffizient",
          back: "D = D₀ · exp(-Q/RT): temperaturabhängiges Maß für die Diffusionsgeschwindigkeit.",
          category: "Diffusion",
          difficulty: Difficulty::Hard,
        },
        PoolCard {
          front: "Aktivierungsenergie",
          back: "Energiebarriere, die ein Atom für einen Platzwechsel überwinden muss.",
          category: "Diffusion",
          difficulty: Difficulty::Medium,
        },
      ],
      exam: &[
        PoolExamQuestion {
          question: "How does the diffusion coefficient change when temperature rises?",
          options: &["It decreases linearly", "It stays constant", "It increases exponentially", "It oscillates"],
          correct_answer: 2,
          points: 5,
          kind: QuestionKind::MultipleChoice,
          explanation: "D follows an Arrhenius law in temperature.",
        },
        PoolExamQuestion {
          question: "Estimate the diffusion distance of carbon in steel at 900°C after 2 hours.",
          options: &["Calculation question"],
          correct_answer: 0,
          points: 15,
          kind: QuestionKind::Calculation,
          explanation: "Use x ≈ √(D·t) with D evaluated at 900°C.",
        },
      ],
    },
  ),
  (
    "w3-ch5",
    ContentPool {
      quiz: &[
        PoolQuestion {
          question: "What does Young's modulus represent?",
          options: ["Yield strength", "Ultimate strength", "Stiffness", "Hardness"],
          correct_answer: 2,
          explanation: "E relates stress to strain in the elastic range, a measure of stiffness.",
          difficulty: Difficulty::Easy,
        },
        PoolQuestion {
          question: "For a Poisson's ratio of 0.3, what is the shear modulus in terms of Young's modulus?",
          options: ["E/2.6", "E/3.0", "E/2.0", "E/1.5"],
          correct_answer: 0,
          explanation: "G = E / (2(1 + ν)) = E / 2.6.",
          difficulty: Difficulty::Hard,
        },
      ],
      cards: &[
        PoolCard {
          front: "Elastizitätsmodul",
          back: "Steifigkeit: Verhältnis von Spannung zu Dehnung im elastischen Bereich.",
          category: "Material Properties",
          difficulty: Difficulty::Medium,
        },
        PoolCard {
          front: "Querkontraktionszahl",
          back: "Verhältnis von Querdehnung zu Längsdehnung bei einachsiger Belastung.",
          category: "Material Properties",
          difficulty: Difficulty::Medium,
        },
        PoolCard {
          front: "Schubmodul",
          back: "Widerstand gegen Scherverformung: G = E / (2(1 + ν)).",
          category: "Material Properties",
          difficulty: Difficulty::Hard,
        },
      ],
      exam: &[
        PoolExamQuestion {
          question: "In which region of the stress-strain curve does Hooke's law hold?",
          options: &["Necking", "Linear elastic", "Strain hardening", "Fracture"],
          correct_answer: 1,
          points: 5,
          kind: QuestionKind::MultipleChoice,
          explanation: "σ = E·ε only in the linear elastic region.",
        },
        PoolExamQuestion {
          question: "A 2 m steel rod with E = 200 GPa carries 500 MPa. Calculate strain and elongation.",
          options: &["Calculation question"],
          correct_answer: 0,
          points: 10,
          kind: QuestionKind::Calculation,
          explanation: "ε = σ/E = 0.0025, so Δl = 0.0025 · 2 m = 5 mm.",
        },
      ],
    },
  ),
];

/// The dedicated pool of a seeded material, if it has one.
pub fn pool_for_material(id: &str) -> Option<&'static ContentPool> {
  MATERIAL_POOLS.iter().find(|(key, _)| *key == id).map(|(_, pool)| pool)
}

/// Pool for `material_id`, or the default pool.
pub fn content_pool(material_id: Option<&str>) -> &'static ContentPool {
  material_id.and_then(pool_for_material).unwrap_or(&DEFAULT_POOL)
}

impl ContentPool {
  pub fn quiz_question(&self, i: usize) -> QuizQuestion {
    let p = &self.quiz[i % self.quiz.len()];
    QuizQuestion {
      question: p.question.into(),
      options: p.options.iter().map(|o| o.to_string()).collect(),
      correct_answer: p.correct_answer,
      explanation: p.explanation.into(),
      difficulty: p.difficulty,
    }
  }

  pub fn card(&self, i: usize) -> Flashcard {
    let p = &self.cards[i % self.cards.len()];
    Flashcard {
      front: p.front.into(),
      back: p.back.into(),
      category: p.category.into(),
      difficulty: p.difficulty,
    }
  }

  pub fn exam_question(&self, i: usize) -> ExamQuestion {
    let p = &self.exam[i % self.exam.len()];
    ExamQuestion {
      question: p.question.into(),
      options: p.options.iter().map(|o| o.to_string()).collect(),
      correct_answer: p.correct_answer,
      points: p.points,
      kind: p.kind,
      explanation: p.explanation.into(),
    }
  }
}

pub fn pool_quiz_question(i: usize) -> QuizQuestion {
  DEFAULT_POOL.quiz_question(i)
}

pub fn pool_card(i: usize) -> Flashcard {
  DEFAULT_POOL.card(i)
}

pub fn pool_exam_question(i: usize) -> ExamQuestion {
  DEFAULT_POOL.exam_question(i)
}

/// Last-resort quiz: pool questions cycled to the requested count, capped at
/// `MAX_ITEMS_PER_REQUEST`.
pub fn fallback_quiz(source: &str, options: &QuizOptions, pool: &ContentPool) -> GeneratedQuiz {
  let n = options.question_count.min(MAX_ITEMS_PER_REQUEST);
  let questions: Vec<QuizQuestion> = (0..n).map(|i| pool.quiz_question(i)).collect();
  GeneratedQuiz {
    metadata: QuizMetadata {
      source_excerpt: excerpt(source, EXCERPT_CHARS),
      generated_at: Utc::now(),
      total_questions: questions.len(),
    },
    questions,
  }
}

/// Last-resort flashcards: pool cards cycled to the requested count.
pub fn fallback_flashcards(source: &str, options: &FlashcardOptions, pool: &ContentPool) -> GeneratedFlashcards {
  let n = options.card_count.min(MAX_ITEMS_PER_REQUEST);
  let cards: Vec<Flashcard> = (0..n).map(|i| pool.card(i)).collect();
  GeneratedFlashcards {
    metadata: FlashcardMetadata {
      source_excerpt: excerpt(source, EXCERPT_CHARS),
      generated_at: Utc::now(),
      total_cards: cards.len(),
    },
    cards,
  }
}

/// Last-resort exam: pool questions cycled to the requested count, points
/// rebalanced under `policy` so the total stays near the target.
pub fn fallback_exam(source: &str, options: &ExamOptions, policy: &ExamPolicy, pool: &ContentPool) -> GeneratedExam {
  let n = options.question_count.min(MAX_ITEMS_PER_REQUEST);
  let questions: Vec<ExamQuestion> = (0..n).map(|i| pool.exam_question(i)).collect();
  let mut exam = GeneratedExam {
    metadata: ExamMetadata {
      source_excerpt: excerpt(source, EXCERPT_CHARS),
      generated_at: Utc::now(),
      total_questions: questions.len(),
      total_points: 0,
      estimated_duration: options.duration_minutes,
    },
    questions,
  };
  exam.metadata.total_points = exam.points_sum();
  rebalance_points(&mut exam, n, policy);
  exam
}

#[cfg(test)]
mod tests {
  use super::*;

  fn all_pools() -> impl Iterator<Item = &'static ContentPool> {
    std::iter::once(&DEFAULT_POOL).chain(MATERIAL_POOLS.iter().map(|(_, p)| p))
  }

  #[test]
  fn pools_are_structurally_valid() {
    for pool in all_pools() {
      assert!(!pool.quiz.is_empty() && !pool.cards.is_empty() && !pool.exam.is_empty());
      for q in pool.quiz {
        assert!(q.correct_answer < q.options.len());
      }
      for q in pool.exam {
        assert!(q.correct_answer < q.options.len());
        assert!(q.points > 0 && q.points <= ExamPolicy::default().max_points_per_question);
      }
    }
  }

  #[test]
  fn materials_have_their_own_pools() {
    let opts = QuizOptions { question_count: 2, ..QuizOptions::default() };
    let defects = fallback_quiz("s", &opts, content_pool(Some("w2-ch3")));
    let elastic = fallback_quiz("s", &opts, content_pool(Some("w3-ch5")));
    assert_ne!(defects.questions, elastic.questions);

    assert!(pool_for_material("uploaded-123").is_none());
    let upload = fallback_quiz("s", &opts, content_pool(Some("uploaded-123")));
    let inline = fallback_quiz("s", &opts, content_pool(None));
    assert_eq!(upload.questions, inline.questions);
    assert_eq!(inline.questions[0], pool_quiz_question(0));
  }

  #[test]
  fn oversized_counts_are_capped() {
    let quiz = fallback_quiz("s", &QuizOptions { question_count: usize::MAX, ..QuizOptions::default() }, &DEFAULT_POOL);
    assert_eq!(quiz.questions.len(), MAX_ITEMS_PER_REQUEST);

    let opts = FlashcardOptions { card_count: usize::MAX, ..FlashcardOptions::default() };
    assert_eq!(fallback_flashcards("s", &opts, &DEFAULT_POOL).cards.len(), MAX_ITEMS_PER_REQUEST);

    let opts = ExamOptions { question_count: 500_000_000, ..ExamOptions::default() };
    let exam = fallback_exam("s", &opts, &ExamPolicy::default(), &DEFAULT_POOL);
    assert_eq!(exam.metadata.total_questions, MAX_ITEMS_PER_REQUEST);
    assert_eq!(exam.metadata.total_points, exam.points_sum());
  }

  #[test]
  fn fallback_quiz_cycles_to_requested_count() {
    let opts = QuizOptions { question_count: 12, ..QuizOptions::default() };
    let quiz = fallback_quiz("some source", &opts, &DEFAULT_POOL);
    assert_eq!(quiz.questions.len(), 12);
    assert_eq!(quiz.metadata.total_questions, 12);
    assert_eq!(quiz.questions[0], quiz.questions[QUIZ_POOL.len()]);
    assert!(quiz.questions.iter().all(|q| q.options.len() == 4 && q.correct_answer < 4));
  }

  #[test]
  fn fallback_flashcards_are_reproducible() {
    let opts = FlashcardOptions { card_count: 7, ..FlashcardOptions::default() };
    let a = fallback_flashcards("text", &opts, content_pool(Some("w2-ch4")));
    let b = fallback_flashcards("text", &opts, content_pool(Some("w2-ch4")));
    assert_eq!(a.cards, b.cards);
    assert_eq!(a.metadata.total_cards, 7);
  }

  #[test]
  fn fallback_exam_keeps_points_near_target() {
    for count in 1..=9 {
      let opts = ExamOptions { question_count: count, ..ExamOptions::default() };
      let exam = fallback_exam("text", &opts, &ExamPolicy::default(), content_pool(Some("w1-ch2")));
      let target = count as f64 * 10.0;
      let sum = exam.points_sum() as f64;
      assert!((sum - target).abs() <= target * 0.2, "count {count}: sum {sum}");
      assert_eq!(exam.metadata.total_questions, count);
      assert_eq!(exam.metadata.estimated_duration, 90);
    }
  }
}
