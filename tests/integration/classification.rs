mod common;
use common::{code_of, first_loop, lower};

use javelin::ast::build::*;
use javelin::ast::{ClassDecl, CompilationUnit, MethodSig};
use javelin::config::CompilerOptions;
use javelin::foreach::classify::{ClassifyError, KindShape, classify};
use javelin::foreach::{ElementConversion, LoopKind};
use javelin::span::Spanned;
use javelin::typeck::{PrimitiveType, Type, TypeEnv};

fn shape_and_conversion(declared: Type, collection: Type) -> (KindShape, Type, ElementConversion) {
    let env = TypeEnv::new();
    let c = classify(&env, &declared, &collection).unwrap();
    (c.shape, c.element_type, c.conversion)
}

#[test]
fn arrays_classify_with_their_component() {
    use PrimitiveType::*;
    let (shape, element, conversion) = shape_and_conversion(Type::Primitive(Long), Type::array(Type::int()));
    assert_eq!(shape, KindShape::Array);
    assert_eq!(element, Type::int());
    assert_eq!(conversion, ElementConversion::Widening { from: Int, to: Long });

    let (_, _, conversion) = shape_and_conversion(Type::int(), Type::array(Type::class("Integer")));
    assert_eq!(conversion, ElementConversion::Unboxing { from: Int, to: Int });

    let (_, _, conversion) = shape_and_conversion(Type::class("Integer"), Type::array(Type::int()));
    assert_eq!(conversion, ElementConversion::Boxing(Int));

    let (_, _, conversion) = shape_and_conversion(Type::object(), Type::array(Type::int()));
    assert_eq!(conversion, ElementConversion::BoxingThenWidening(Int));

    let (_, _, conversion) = shape_and_conversion(Type::Primitive(Double), Type::array(Type::class("Integer")));
    assert_eq!(conversion, ElementConversion::Unboxing { from: Int, to: Double });
}

#[test]
fn iterables_by_instantiation() {
    let (shape, element, _) = shape_and_conversion(Type::object(), Type::class("Collection"));
    assert_eq!(shape, KindShape::RawIterable { receiver: Type::class("Collection") });
    assert_eq!(element, Type::object());

    let (shape, element, _) = shape_and_conversion(Type::string(), Type::generic("Set", vec![Type::string()]));
    assert_eq!(shape, KindShape::GenericIterable { receiver: Type::class("Set") });
    assert_eq!(element, Type::string());

    let wildcard = Type::generic("List", vec![Type::Wildcard(Some(Box::new(Type::class("Number"))))]);
    let (shape, element, _) = shape_and_conversion(Type::class("Number"), wildcard);
    assert!(matches!(shape, KindShape::GenericIterable { .. }));
    assert_eq!(element, Type::class("Number"));
}

#[test]
fn type_variable_collection_dispatches_on_its_bound() {
    let t = Type::type_var("T", Type::generic("Iterable", vec![Type::string()]));
    let (shape, element, _) = shape_and_conversion(Type::string(), t);
    assert_eq!(shape, KindShape::GenericIterable { receiver: Type::class("Iterable") });
    assert_eq!(element, Type::string());
}

#[test]
fn non_iterables_are_rejected() {
    let env = TypeEnv::new();
    for collection in [Type::int(), Type::string(), Type::class("Integer")] {
        let err = classify(&env, &Type::object(), &collection).unwrap_err();
        assert!(matches!(err, ClassifyError::NotIterable { .. }), "{collection}");
    }
}

#[test]
fn type_variable_loop_lowers_through_iterable() {
    let mut m = method(
        "m",
        vec![param("items", ty("T"))],
        vec![foreach("s", ty("String"), name("items"), Some(expr_stmt(call("useObject", vec![name("s")]))))],
    );
    m.type_params = vec![type_param("T", Some(generic("Iterable", vec![ty("String")])))];
    let lowered = lower(&mut m);
    assert!(!lowered.has_errors(), "{:#?}", lowered.diagnostics);
    assert!(matches!(
        first_loop(&m).info.classification.kind(),
        Some(LoopKind::GenericIterable { .. })
    ));
    assert_eq!(
        lowered.code.unwrap().lines()[1],
        "invokeinterface java/lang/Iterable.iterator()Ljava/util/Iterator;"
    );
}

#[test]
fn user_declared_iterable_class() {
    let class = ClassDecl {
        name: Spanned::dummy("Bag".to_string()),
        type_params: Vec::new(),
        is_interface: false,
        superclass: None,
        interfaces: vec![generic("Iterable", vec![ty("Integer")])],
        methods: vec![MethodSig { name: "size".to_string(), params: Vec::new(), return_type: Some(ty("int")) }],
    };
    let mut unit = CompilationUnit {
        name: "Main".to_string(),
        source: None,
        classes: vec![Spanned::dummy(class)],
        functions: vec![Spanned::dummy(function("use", vec![ty("long")], None))],
        methods: vec![Spanned::dummy(method(
            "total",
            vec![param("bag", ty("Bag"))],
            vec![foreach("n", ty("long"), name("bag"), Some(expr_stmt(call("use", vec![name("n")]))))],
        ))],
    };
    let lowered = javelin::lower_unit(&mut unit, &CompilerOptions::default()).unwrap();
    let code = lowered[0].code.as_ref().unwrap();
    let lines = code.lines();
    assert_eq!(lines[1], "invokevirtual Bag.iterator()Ljava/util/Iterator;");
    let cast = lines.iter().position(|l| l == "checkcast java/lang/Integer").unwrap();
    assert_eq!(
        lines[cast + 1..cast + 4],
        ["invokevirtual java/lang/Integer.intValue()I", "i2l", "lstore 1"]
    );
}

#[test]
fn invalid_loop_produces_no_code_but_method_lowers() {
    let code = {
        let mut m = method(
            "m",
            vec![param("s", ty("String"))],
            vec![foreach("c", ty("int"), name("s"), None), expr_stmt(call("use", vec![int(7)]))],
        );
        let lowered = lower(&mut m);
        assert!(lowered.has_errors());
        lowered.code.unwrap()
    };
    assert_eq!(code.lines(), ["iconst 7", "invokestatic Main.use(I)V", "return"]);
}

#[test]
fn array_of_strings_keeps_reference_loads() {
    let code = code_of(method(
        "m",
        vec![param("names", array_of(ty("String")))],
        vec![foreach("s", ty("Object"), name("names"), Some(expr_stmt(call("useObject", vec![name("s")]))))],
    ));
    let lines = code.lines();
    assert!(lines.contains(&"aaload".to_string()));
    assert!(lines.contains(&"astore 1".to_string()));
    assert_eq!(code.count("checkcast"), 0);
}
