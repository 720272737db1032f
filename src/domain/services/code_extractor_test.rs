use test_utils::fenced;
use test_utils::response_fixture;

use super::extract;

#[test]
fn it_extracts_a_tagged_block() {
    let res = extract("```python\nprint('hello')\n```");
    assert_eq!(res, "print('hello')");
}

#[test]
fn it_extracts_an_untagged_block() {
    let res = extract("Here you go:\n```\nprint('hello')\n```\nEnjoy.");
    assert_eq!(res, "print('hello')");
}

#[test]
fn it_extracts_only_the_first_block() {
    let res = extract(response_fixture());
    insta::assert_snapshot!(res, @r###"
    for i in range(11):
        print(i)
    "###);
}

#[test]
fn it_trims_surrounding_whitespace() {
    let res = extract(&fenced("\n\n   x = 1\nprint(x)   \n\n"));
    assert_eq!(res, "x = 1\nprint(x)");
}

#[test]
fn it_keeps_inner_indentation() {
    let res = extract("```py\ndef f():\n    return 1\n\nprint(f())\n```");
    assert_eq!(res, "def f():\n    return 1\n\nprint(f())");
}

#[test]
fn it_keeps_inline_blocks_intact() {
    let res = extract("Run ```print(1)``` and see.");
    assert_eq!(res, "print(1)");
}

#[test]
fn it_falls_back_to_the_whole_text() {
    let res = extract("  print('no fences here')\n\n");
    assert_eq!(res, "print('no fences here')");
}

#[test]
fn it_falls_back_on_an_unclosed_fence() {
    let res = extract("```python\nprint('never closed')\n");
    assert_eq!(res, "```python\nprint('never closed')");
}

#[test]
fn it_returns_empty_for_empty_input() {
    assert_eq!(extract(""), "");
    assert_eq!(extract("```python\n```"), "");
}

#[test]
fn it_is_idempotent() {
    let first = extract(response_fixture());
    let second = extract(response_fixture());
    assert_eq!(first, second);
    assert_eq!(extract(&first), first);
}
