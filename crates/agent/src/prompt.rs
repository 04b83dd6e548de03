use inmobot_core::domain::profile::{Profile, Stage};
use inmobot_core::qualification;

/// Renders the system prompt for one model call. Re-rendered from the latest
/// profile on every loop iteration so tool writes are visible to the next
/// completion in the same run.
pub fn render_system_prompt(profile: &Profile) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "Eres asesor inmobiliario de Inmobiliaria del Valle en la zona metropolitana \
         de Guadalajara. Atiendes prospectos por WhatsApp en español, con tono cercano \
         y profesional. Responde en mensajes cortos, máximo tres oraciones, y haz una \
         sola pregunta a la vez.\n\n",
    );

    prompt.push_str("Perfil actual del prospecto:\n");
    push_attribute(&mut prompt, "Tipo de propiedad", profile.property_type.as_deref());
    push_attribute(&mut prompt, "Zona", profile.zone.as_deref());
    push_attribute(&mut prompt, "Presupuesto", profile.budget.as_deref());
    push_attribute(
        &mut prompt,
        "Perfil de comprador",
        profile.buyer_profile.map(|value| value.as_str()),
    );
    push_attribute(
        &mut prompt,
        "Forma de pago",
        profile.payment_method.map(|value| value.as_str()),
    );
    push_attribute(
        &mut prompt,
        "Estado del crédito",
        profile.credit_status.map(|value| value.as_str()),
    );
    if let Some(summary) = profile.summary.as_deref() {
        prompt.push_str("- Resumen: ");
        prompt.push_str(summary);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "- Etapa: {}\n- Puntaje de calificación: {}\n\n",
        profile.stage.as_str(),
        qualification::score(profile)
    ));

    let missing = missing_attributes(profile);
    if !missing.is_empty() {
        prompt.push_str("Datos que aún faltan, en orden de prioridad: ");
        prompt.push_str(&missing.join(", "));
        prompt.push_str(". Obtén el siguiente dato faltante de forma natural, \
                         sin interrogar.\n\n");
    }

    prompt.push_str(stage_guidance(profile.stage));
    prompt.push_str(
        "\n\nHerramientas: usa update_profile cuando el prospecto revele etapa, \
         intención o datos que la conversación confirme; usa query_listings solo \
         cuando conozcas tipo de propiedad y zona; usa schedule_visit únicamente \
         cuando el prospecto proponga o acepte una fecha concreta. Nunca inventes \
         propiedades ni precios: ofrece solo lo que devuelva query_listings.",
    );

    prompt
}

fn push_attribute(prompt: &mut String, label: &str, value: Option<&str>) {
    prompt.push_str("- ");
    prompt.push_str(label);
    prompt.push_str(": ");
    match value {
        Some(value) => {
            prompt.push_str(value);
            prompt.push_str(" (ya confirmado, no volver a preguntar)");
        }
        None => prompt.push_str("(desconocido)"),
    }
    prompt.push('\n');
}

fn missing_attributes(profile: &Profile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.property_type.is_none() {
        missing.push("tipo de propiedad");
    }
    if profile.zone.is_none() {
        missing.push("zona");
    }
    if profile.budget.is_none() {
        missing.push("presupuesto");
    }
    if profile.payment_method.is_none() {
        missing.push("forma de pago");
    }
    missing
}

fn stage_guidance(stage: Stage) -> &'static str {
    match stage {
        Stage::Initial => {
            "Etapa inicial: da la bienvenida y descubre qué busca el prospecto."
        }
        Stage::Searching => {
            "Etapa de búsqueda: completa el perfil y, cuando tengas tipo y zona, \
             comparte opciones concretas del inventario."
        }
        Stage::Interested => {
            "Etapa de interés: el prospecto ya vio opciones que le gustaron; \
             oriéntalo hacia agendar una visita."
        }
        Stage::AppointmentScheduled => {
            "Visita agendada: confirma los detalles de la cita y resuelve dudas; \
             no ofrezcas propiedades nuevas salvo que lo pida."
        }
    }
}
