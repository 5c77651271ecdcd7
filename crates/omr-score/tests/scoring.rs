use approx::assert_relative_eq;
use omr_core::{CanonicalSize, MarkRect};
use omr_score::render::{render_sheet, PencilMark, RenderOptions};
use omr_score::{
    resolve_answers, score, AnswerKey, AnswerRecord, BubbleBlock, BubbleClassifier, BubbleState,
    LayoutSpec, QuestionAnswer, ScoringEngine, SheetVersion, SubjectMap, VersionLayout,
};

fn five_question_layout() -> LayoutSpec {
    LayoutSpec {
        canonical: CanonicalSize::new(200, 300),
        frame_thickness: 4.0,
        orientation_marker: MarkRect::new(10.0, 10.0, 20.0, 20.0),
        version_marks: Vec::new(),
        versions: vec![VersionLayout {
            id: SheetVersion::new("A"),
            blocks: vec![BubbleBlock {
                first_question: 1,
                questions: 5,
                options: 5,
                origin: [40.0, 60.0],
                option_pitch: 28.0,
                question_pitch: 40.0,
            }],
        }],
        region_fraction: 0.5,
    }
}

#[test]
fn five_question_scenario() {
    let spec = five_question_layout();
    let layout = spec.model(&SheetVersion::new("A")).expect("layout");
    let key = AnswerKey::new(SheetVersion::new("A"), [(1, 0), (2, 1), (3, 2), (4, 3), (5, 4)]);
    let answers = [
        (1, AnswerRecord::Selected(0)),
        (2, AnswerRecord::Selected(1)),
        (3, AnswerRecord::Multiple),
        (4, AnswerRecord::Selected(3)),
        (5, AnswerRecord::Blank),
    ]
    .map(|(question, answer)| QuestionAnswer { question, answer });
    let subjects = SubjectMap::uniform(["All"], 5);

    let result = score(&answers, &key, &subjects, &layout).expect("graded");
    assert_eq!(result.correctness(), vec![true, true, false, true, false]);
    assert_eq!(result.total_correct, 3);
    assert_eq!(result.total_questions, 5);
    assert_relative_eq!(result.percentage, 60.0);
    assert_eq!(result.multiple, 1);
    assert_eq!(result.blank, 1);
    assert_eq!(result.incorrect, 0);
}

#[test]
fn rendered_scenario_grades_end_to_end_on_canonical_view() {
    let spec = five_question_layout();
    let version = SheetVersion::new("A");
    let layout = spec.model(&version).expect("layout");
    let marks = [
        PencilMark::new(1, 0),
        PencilMark::new(2, 1),
        PencilMark::new(3, 2),
        PencilMark::new(3, 4),
        PencilMark::new(4, 3),
    ];
    let img = render_sheet(&spec, &version, &marks, &RenderOptions::default()).expect("render");

    let classification = BubbleClassifier::default().classify(&img.view(), &layout);
    assert_eq!(classification.marked_count(), 5);
    assert_eq!(classification.questions[4].states, vec![BubbleState::Unmarked; 5]);

    let answers = resolve_answers(&classification);
    let key = AnswerKey::from_letters(version.clone(), "ABCDE").expect("key");
    let engine = ScoringEngine::new(&layout, &key, &SubjectMap::uniform(["All"], 5)).expect("engine");
    let result = engine.score(&answers);
    assert_eq!(result.correctness(), vec![true, true, false, true, false]);
    assert_relative_eq!(result.percentage, 60.0);
}

#[test]
fn blank_reference_sheet_scores_zero_without_failures() {
    let spec = LayoutSpec::reference();
    for id in ["A", "B", "C", "D"] {
        let version = SheetVersion::new(id);
        let layout = spec.model(&version).expect("layout");
        let img = render_sheet(&spec, &version, &[], &RenderOptions::default()).expect("render");
        let classification = BubbleClassifier::default().classify(&img.view(), &layout);
        assert_eq!(classification.marked_count(), 0);
        assert!(!classification.thresholds.bimodal);

        let key = AnswerKey::new(version.clone(), (1..=100).map(|q| (q, 0)));
        let result = score(
            &resolve_answers(&classification),
            &key,
            &SubjectMap::reference(),
            &layout,
        )
        .expect("graded");
        assert_eq!(result.total_correct, 0);
        assert_eq!(result.blank, 100);
        assert!(result.subjects.iter().all(|s| s.correct == 0 && s.percentage == 0.0));
    }
}

#[test]
fn faint_marks_stay_blank_instead_of_marked() {
    let spec = LayoutSpec::reference();
    let version = SheetVersion::new("A");
    let layout = spec.model(&version).expect("layout");
    let mut marks: Vec<PencilMark> = (1..=40).map(|q| PencilMark::new(q, (q % 5) as u8)).collect();
    // barely-there smudge on question 41
    marks.push(PencilMark {
        question: 41,
        option: 2,
        ink: 140,
    });
    let img = render_sheet(&spec, &version, &marks, &RenderOptions::default()).expect("render");
    let classification = BubbleClassifier::default().classify(&img.view(), &layout);
    let answers = resolve_answers(&classification);

    assert_eq!(answers[0].answer, AnswerRecord::Selected(1));
    assert_eq!(classification.questions[40].states[2], BubbleState::Ambiguous);
    assert_eq!(answers[40].answer, AnswerRecord::Blank);
}
