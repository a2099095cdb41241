//! Integration tests: reference workflow manifests against each stage's rules.

use autocoder_rules::{validate_workflow, RuleSpecification, Stage, ValueTree};

const REPO: &str = "octo/autocoder";

fn check(stage: Stage, manifest: &str) -> Result<(), String> {
    let rules = RuleSpecification::for_stage(stage, REPO)
        .workflow
        .expect("stage has workflow rules");
    let doc = ValueTree::decode(manifest).map_err(|e| e.to_string())?;
    validate_workflow(&doc, &rules).map_err(|e| e.to_string())
}

const STAGE3: &str = r#"
name: Issue echo
on:
  issues:
    types: [opened, reopened, edited]
jobs:
  show:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4.1.1
      - name: Print issue
        run: echo "$NUMBER $TITLE"
        env:
          NUMBER: ${{ github.event.issue.number }}
          TITLE: ${{ github.event.issue.title }}
          BODY: ${{ github.event.issue.body }}
          LABELS: ${{ join(github.event.issue.labels.*.name, ', ') }}
          ASSIGNEES: ${{ join(github.event.issue.assignees.*.login, ', ') }}
"#;

const STAGE5: &str = r#"
on:
  issues:
    types: [opened, reopened, labeled]
jobs:
  generate:
    runs-on: ubuntu-latest
    if: contains(github.event.issue.labels.*.name, 'autocoder-bot')
    steps:
      - uses: actions/checkout@v4
      - run: chmod +x ./scripts/script.sh
      - run: ./scripts/script.sh ${{ secrets.GITHUB_TOKEN }} ${{ github.repository }}
      - uses: actions/upload-artifact@v4
        with:
          name: autocoder-artifact
          path: autocoder-bot/
      - uses: actions/download-artifact@v4
        with:
          name: autocoder-artifact
          path: ./autocoder-artifact
      - run: ls -R ./autocoder-artifact
"#;

const STAGE6: &str = r#"
on:
  issues:
    types: [opened, reopened, labeled]
jobs:
  generate:
    runs-on: ubuntu-latest
    if: contains(github.event.issue.labels.*.name, 'autocoder-bot')
    steps:
      - uses: actions/checkout@v4
      - run: chmod +x ./scripts/script.sh
      - run: ./scripts/script.sh
      - run: |
          git config --local user.email "actions@github.com"
          git config --local user.name "autocoder-bot"
          git add .
          git commit -m "Add generated code"
      - uses: peter-evans/create-pull-request@v6
"#;

const STAGE7: &str = r#"
on:
  issues:
    types: [opened, reopened, labeled]
jobs:
  generate:
    runs-on: ubuntu-latest
    if: contains(github.event.issue.labels.*.name, 'autocoder-bot')
    steps:
      - uses: actions/checkout@v4
      - uses: octo/autocoder@main
        with:
          LABEL: autocoder-bot
"#;

#[test]
fn test_reference_manifests_pass() {
    assert_eq!(check(Stage::Three, STAGE3), Ok(()));
    assert_eq!(check(Stage::Five, STAGE5), Ok(()));
    assert_eq!(check(Stage::Six, STAGE6), Ok(()));
    assert_eq!(check(Stage::Seven, STAGE7), Ok(()));
}

#[test]
fn test_stage_three_manifest_fails_later_stage() {
    let err = check(Stage::Five, STAGE3).unwrap_err();
    assert_eq!(
        err,
        "The workflow does not run on opened, reopened, and labeled issues."
    );
}

#[test]
fn test_stage_three_missing_env_value() {
    let manifest = STAGE3.replace(
        "          ASSIGNEES: ${{ join(github.event.issue.assignees.*.login, ', ') }}\n",
        "",
    );
    let err = check(Stage::Three, &manifest).unwrap_err();
    assert_eq!(
        err,
        "The following environment variables are missing in the 'env' key of a step: ${{ join(github.event.issue.assignees.*.login, ', ') }}"
    );
}

#[test]
fn test_stage_five_guard_required() {
    let manifest = STAGE5.replace(
        "    if: contains(github.event.issue.labels.*.name, 'autocoder-bot')\n",
        "",
    );
    let err = check(Stage::Five, &manifest).unwrap_err();
    assert!(err.contains("'if' condition"), "{err}");
}

#[test]
fn test_stage_seven_requires_own_action() {
    let manifest = STAGE7.replace("octo/autocoder@main", "someone/else@main");
    assert_eq!(
        check(Stage::Seven, &manifest).unwrap_err(),
        "The job does not have a step to interact with ChatGPT."
    );
}

#[test]
fn test_stage_seven_requires_checkout() {
    let manifest = STAGE7.replace("      - uses: actions/checkout@v4\n", "");
    assert_eq!(
        check(Stage::Seven, &manifest).unwrap_err(),
        "The job does not have a step to checkout the repository."
    );
}

#[test]
fn test_malformed_manifest_is_decode_error() {
    assert!(ValueTree::decode("on: [issues\njobs:").is_err());
}
